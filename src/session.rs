//! Per-connection session: state machine and connection loop.
//!
//! Each accepted socket gets one [`Session`] and one task running [`run`].
//! The loop multiplexes three things: inbound frames, the outgoing queue
//! other sessions deliver into, and the idle timer. A correlated `response`
//! packet is written before the next inbound frame is read, so a client
//! that asked for a response sees it before anything it sends next is
//! acted on.

use futures_util::{SinkExt, StreamExt};
use palaver_proto::{Direction, FieldValue, FrameCodec, Packet, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

use crate::directory::SessionId;
use crate::handlers::{self, HandlerError, Reply};
use crate::hub::Hub;

/// Capacity of the per-session outgoing queue.
const OUTGOING_QUEUE: usize = 64;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, connect handshake not yet completed.
    Pending,
    /// Handshake done; the session holds a nickname and receives fan-out.
    Active,
    /// Torn down; no further transitions.
    Closed,
}

/// State for one connection, owned by its connection task.
pub struct Session {
    /// Session id assigned at accept time.
    pub id: SessionId,
    /// Peer address.
    pub addr: SocketAddr,
    /// Lifecycle state.
    pub state: SessionState,
    /// Nickname, set when the handshake completes.
    pub nick: Option<String>,
    /// When set, a response is sent for every handled packet, asked for
    /// or not.
    pub debug: bool,
    /// Account name after a successful login.
    pub authed_as: Option<String>,
    /// Shared server state.
    pub hub: Arc<Hub>,
    /// Sender half of this session's outgoing queue, handed to the
    /// directory so other sessions can deliver to us.
    pub outgoing: mpsc::Sender<Packet>,
}

impl Session {
    /// The nickname of an active session.
    ///
    /// Handlers that require an active session call this after the pending
    /// guard has already run, so a missing nickname is a protocol-state bug.
    pub fn nick_or_malformed(&self) -> Result<&str, HandlerError> {
        self.nick
            .as_deref()
            .ok_or(HandlerError::Malformed("active session without nickname"))
    }
}

/// Drive one connection to completion.
#[instrument(name = "session", skip(hub, stream, addr), fields(peer = %addr))]
pub async fn run(hub: Arc<Hub>, id: SessionId, stream: TcpStream, addr: SocketAddr) {
    let codec = FrameCodec::with_max_frame_len(
        Arc::clone(&hub.schema),
        Direction::Serverbound,
        hub.max_frame_len,
    );
    let mut framed = Framed::new(stream, codec);

    let (tx, mut rx) = mpsc::channel(OUTGOING_QUEUE);
    let mut session = Session {
        id,
        addr,
        state: SessionState::Pending,
        nick: None,
        debug: false,
        authed_as: None,
        hub: Arc::clone(&hub),
        outgoing: tx,
    };

    let idle = Duration::from_secs(hub.idle_secs);
    let mut last_inbound = Instant::now();
    let mut quit_reason: Option<String> = None;

    loop {
        tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(packet)) => {
                    last_inbound = Instant::now();
                    match handlers::dispatch(&mut session, &packet).await {
                        Ok(reply) => {
                            let wanted = packet.descriptor().flags.response_requested;
                            if wanted || reply.force || session.debug {
                                let response = match build_response(&hub, &reply) {
                                    Ok(response) => response,
                                    Err(err) => {
                                        warn!(error = %err, "Failed to build response");
                                        break;
                                    }
                                };
                                if let Err(err) = framed.send(response).await {
                                    warn!(error = %err, "Failed to write response");
                                    break;
                                }
                            }
                        }
                        Err(HandlerError::Quit(reason)) => {
                            quit_reason = reason;
                            break;
                        }
                        Err(err) => {
                            warn!(error = %err, "Handler failed, closing session");
                            break;
                        }
                    }
                }
                Some(Err(err)) => {
                    // A malformed frame was fully consumed by the codec, so
                    // the stream stays in sync; only errors that lose framing
                    // take the connection down.
                    if frame_recoverable(&err) {
                        warn!(error = %err, "Discarding malformed frame");
                    } else {
                        warn!(error = %err, "Unrecoverable protocol error, closing session");
                        break;
                    }
                }
                None => {
                    debug!("Peer closed connection");
                    break;
                }
            },

            Some(packet) = rx.recv() => {
                if let Err(err) = framed.send(packet).await {
                    warn!(error = %err, "Failed to write queued packet");
                    break;
                }
            }

            _ = tokio::time::sleep_until(last_inbound + idle) => {
                info!(idle_secs = hub.idle_secs, "Idle timeout, closing session");
                break;
            }
        }
    }

    close(&mut session, quit_reason).await;
}

/// Whether the stream can continue after this decode error.
///
/// Length-prefix errors mean the framing itself is lost; everything else is
/// detected after the whole frame was pulled off the stream.
fn frame_recoverable(err: &ProtocolError) -> bool {
    !matches!(
        err,
        ProtocolError::Io(_) | ProtocolError::TooShort { .. } | ProtocolError::FrameTooLarge { .. }
    )
}

fn build_response(hub: &Hub, reply: &Reply) -> Result<Packet, ProtocolError> {
    hub.clientbound(
        "response",
        vec![
            FieldValue::Uint(u32::from(reply.status)),
            reply.message.as_str().into(),
        ],
    )
}

/// Tear the session down: directory removal and departure broadcast for
/// active sessions, nothing for pending ones. Every close path funnels
/// through here exactly once.
async fn close(session: &mut Session, reason: Option<String>) {
    if session.state == SessionState::Closed {
        return;
    }
    let was_active = session.state == SessionState::Active;
    session.state = SessionState::Closed;

    if !was_active {
        debug!(id = session.id, peer = %session.addr, "Pending session closed");
        return;
    }

    session.hub.directory.remove(session.id);
    let Some(nick) = session.nick.clone() else {
        return;
    };
    let message = reason.clone().unwrap_or_default();

    match session
        .hub
        .clientbound("disconnect", vec![nick.as_str().into(), message.as_str().into()])
    {
        Ok(packet) => {
            session.hub.directory.broadcast(&packet, None);
        }
        Err(err) => warn!(error = %err, "Failed to build disconnect broadcast"),
    }
    info!(id = session.id, %nick, reason = %message, "Session closed");
}
