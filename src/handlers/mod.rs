//! Packet handlers.
//!
//! Inbound packets are routed by [`PacketKind`] through [`dispatch`], one
//! handler per kind. Handlers return a [`Reply`] carrying the status code
//! and human-readable message for the correlated `response` packet; the
//! session decides whether that reply actually goes on the wire (the
//! descriptor's response flag, or a forced reply for protocol guards).

mod command;
pub mod connect;
mod lifecycle;
pub mod messaging;

use palaver_proto::{PacketKind, Packet, ProtocolError};
use thiserror::Error;

use crate::db::AuthError;
use crate::session::{Session, SessionState};

/// Response status codes.
pub mod status {
    /// Request succeeded.
    pub const OK: u8 = 0;
    /// Addressed nickname does not belong to an active session.
    pub const TARGET_NOT_FOUND: u8 = 1;
    /// Message exceeds the configured maximum length.
    pub const MESSAGE_TOO_LONG: u8 = 2;
    /// Message body is empty.
    pub const EMPTY_MESSAGE: u8 = 3;
    /// Keyword is not a registered command.
    pub const UNKNOWN_COMMAND: u8 = 4;
    /// Requested nickname already belongs to an active session.
    pub const NAME_IN_USE: u8 = 5;
    /// Credentials were rejected.
    pub const AUTH_FAILED: u8 = 6;
    /// A command argument failed validation.
    pub const BAD_ARGUMENT: u8 = 7;
    /// The connect handshake has not completed.
    pub const NOT_CONNECTED: u8 = 127;
}

/// Outcome of a handled packet, echoed back as a `response` packet when the
/// request asked for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status code.
    pub status: u8,
    /// Human-readable message.
    pub message: String,
    /// Send the response even when the request did not ask for one.
    pub force: bool,
}

impl Reply {
    /// A successful reply.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: status::OK,
            message: message.into(),
            force: false,
        }
    }

    /// A failed reply with the given status code.
    pub fn err(status: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            force: false,
        }
    }

    /// Mark the reply as sent unconditionally.
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Errors that end packet handling for the current frame or session.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The session asked to close; carries the optional reason.
    #[error("session quit")]
    Quit(Option<String>),

    /// A schema-valid packet carried a value the handler cannot use.
    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    /// Building or queueing an outbound packet failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The credential store failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Route one inbound packet to its handler.
///
/// Sessions that have not completed the connect handshake may only send
/// `connect`; anything else is answered with a forced "connection not
/// complete" response and no state change. The frame still counts as
/// activity for the idle timer, so a pre-handshake `keep_alive` is rejected
/// but keeps the connection alive.
pub async fn dispatch(session: &mut Session, packet: &Packet) -> Result<Reply, HandlerError> {
    let kind = packet.descriptor().kind;

    if session.state == SessionState::Pending && kind != PacketKind::Connect {
        return Ok(Reply::err(status::NOT_CONNECTED, "connection not complete").forced());
    }

    match kind {
        PacketKind::Connect => connect::handle(session, packet).await,
        PacketKind::Disconnect => lifecycle::handle_disconnect(packet),
        PacketKind::SendMessage => messaging::handle_send(session, packet).await,
        PacketKind::DirectMessage => messaging::handle_direct(session, packet).await,
        PacketKind::Emote => messaging::handle_emote(session, packet).await,
        PacketKind::Command => command::handle(session, packet).await,
        PacketKind::KeepAlive => lifecycle::handle_keep_alive(),
        PacketKind::Response => lifecycle::handle_response(session, packet),
        // Clientbound-only; the serverbound parse namespace cannot produce it.
        PacketKind::RecieveMessage => {
            Err(HandlerError::Malformed("clientbound packet on serverbound stream"))
        }
    }
}
