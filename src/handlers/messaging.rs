//! Chat fan-out: broadcast messages, emotes and direct messages.

use palaver_proto::Packet;
use tracing::debug;

use crate::session::Session;

use super::{status, HandlerError, Reply};

/// Shared message-body policy. Applied identically whether the content
/// arrives as a dedicated packet or through a slash command.
pub fn check_content(session: &Session, content: &str) -> Option<Reply> {
    if content.is_empty() {
        return Some(Reply::err(status::EMPTY_MESSAGE, "message is empty"));
    }
    if content.len() > session.hub.max_message_len {
        return Some(Reply::err(
            status::MESSAGE_TOO_LONG,
            format!(
                "message exceeds {} bytes",
                session.hub.max_message_len
            ),
        ));
    }
    None
}

/// Broadcast a chat message to every other active session.
pub async fn handle_send(session: &mut Session, packet: &Packet) -> Result<Reply, HandlerError> {
    let content = packet
        .str_field("content")
        .ok_or(HandlerError::Malformed("send_message without content"))?;
    broadcast_chat(session, "recieve_message", content).await
}

/// Broadcast a third-person action message.
pub async fn handle_emote(session: &mut Session, packet: &Packet) -> Result<Reply, HandlerError> {
    let content = packet
        .str_field("content")
        .ok_or(HandlerError::Malformed("emote without content"))?;
    broadcast_chat(session, "emote", content).await
}

/// Fan a message out under the given clientbound packet name.
pub async fn broadcast_chat(
    session: &Session,
    packet_name: &str,
    content: &str,
) -> Result<Reply, HandlerError> {
    if let Some(reply) = check_content(session, content) {
        return Ok(reply);
    }

    let nick = session.nick_or_malformed()?;
    let packet = session
        .hub
        .clientbound(packet_name, vec![nick.into(), content.into()])?;
    let delivered = session.hub.directory.broadcast(&packet, Some(session.id));
    debug!(id = session.id, delivered, "Message fanned out");

    Ok(Reply::ok("delivered"))
}

/// Deliver a nickname-addressed message to exactly one session.
pub async fn handle_direct(session: &mut Session, packet: &Packet) -> Result<Reply, HandlerError> {
    let target = packet
        .str_field("target")
        .ok_or(HandlerError::Malformed("direct_message without target"))?
        .to_string();
    let content = packet
        .str_field("content")
        .ok_or(HandlerError::Malformed("direct_message without content"))?
        .to_string();
    send_direct(session, &target, &content).await
}

/// Direct-message delivery shared by the packet handler and the `message`
/// command.
pub async fn send_direct(
    session: &Session,
    target: &str,
    content: &str,
) -> Result<Reply, HandlerError> {
    if let Some(reply) = check_content(session, content) {
        return Ok(reply);
    }

    let Some(peer) = session.hub.directory.find_by_nick(target) else {
        return Ok(Reply::err(
            status::TARGET_NOT_FOUND,
            format!("no active user named {target:?}"),
        ));
    };

    let nick = session.nick_or_malformed()?;
    let packet = session
        .hub
        .clientbound("direct_message", vec![nick.into(), content.into()])?;

    if peer.tx.try_send(packet).is_err() {
        // The target is either gone or its queue is full because its
        // connection task stopped draining; either way delivery failed.
        return Ok(Reply::err(
            status::TARGET_NOT_FOUND,
            format!("no active user named {target:?}"),
        ));
    }

    Ok(Reply::ok(format!("delivered to {}", peer.nick)))
}
