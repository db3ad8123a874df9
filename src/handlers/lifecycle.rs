//! Session lifecycle packets: disconnect, keep_alive, inbound responses.

use palaver_proto::Packet;
use tracing::debug;

use crate::session::Session;

use super::{HandlerError, Reply};

/// Handle a serverbound `disconnect`. The session loop performs the actual
/// teardown (directory removal, departure broadcast).
pub fn handle_disconnect(packet: &Packet) -> Result<Reply, HandlerError> {
    let reason = packet
        .str_field("message")
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    Err(HandlerError::Quit(reason))
}

/// Handle a `keep_alive`. The idle timer was already reset when the frame
/// arrived; there is nothing else to do.
pub fn handle_keep_alive() -> Result<Reply, HandlerError> {
    Ok(Reply::ok(""))
}

/// Handle an inbound `response`. Clients are not expected to send these;
/// log and move on rather than dropping the connection.
pub fn handle_response(session: &Session, packet: &Packet) -> Result<Reply, HandlerError> {
    debug!(
        id = session.id,
        status = packet.uint_field("value"),
        "Ignoring inbound response packet"
    );
    Ok(Reply::ok(""))
}
