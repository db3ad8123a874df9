//! Connect handshake and nickname changes.

use palaver_proto::Packet;
use tracing::info;

use crate::session::{Session, SessionState};

use super::{status, HandlerError, Reply};

/// Handle a serverbound `connect`.
///
/// In `Pending` state this is the handshake: claim the nickname, activate
/// the session and announce the arrival. In `Active` state it is a nickname
/// change. Both paths fail with `NAME_IN_USE` when another active session
/// holds the nickname, case-insensitively.
pub async fn handle(session: &mut Session, packet: &Packet) -> Result<Reply, HandlerError> {
    let nick = packet
        .str_field("nickname")
        .ok_or(HandlerError::Malformed("connect without nickname"))?
        .trim()
        .to_string();

    match session.state {
        SessionState::Pending => activate(session, &nick).await,
        SessionState::Active => change_nick(session, &nick).await,
        SessionState::Closed => Ok(Reply::err(status::NOT_CONNECTED, "session closed")),
    }
}

fn check_nick(nick: &str) -> Option<Reply> {
    if nick.is_empty() {
        return Some(Reply::err(status::BAD_ARGUMENT, "nickname must not be empty"));
    }
    if nick.chars().any(char::is_whitespace) {
        return Some(Reply::err(
            status::BAD_ARGUMENT,
            "nickname must not contain whitespace",
        ));
    }
    None
}

async fn activate(session: &mut Session, nick: &str) -> Result<Reply, HandlerError> {
    if let Some(reply) = check_nick(nick) {
        return Ok(reply);
    }

    if session
        .hub
        .directory
        .insert(session.id, nick, session.outgoing.clone())
        .is_err()
    {
        return Ok(Reply::err(
            status::NAME_IN_USE,
            format!("nickname {nick:?} is already in use"),
        ));
    }

    session.nick = Some(nick.to_string());
    session.state = SessionState::Active;
    info!(id = session.id, %nick, "Session connected");

    announce(session, nick).await?;
    Ok(Reply::ok(format!(
        "welcome to {}, {nick}",
        session.hub.server_name
    )))
}

/// Change an active session's nickname. Shared with the `connect` command.
pub async fn change_nick(session: &mut Session, nick: &str) -> Result<Reply, HandlerError> {
    if let Some(reply) = check_nick(nick) {
        return Ok(reply);
    }

    let old = session.nick_or_malformed()?.to_string();
    if session.hub.directory.rename(session.id, nick).is_err() {
        return Ok(Reply::err(
            status::NAME_IN_USE,
            format!("nickname {nick:?} is already in use"),
        ));
    }

    session.nick = Some(nick.to_string());
    info!(id = session.id, %old, new = %nick, "Nickname changed");

    announce(session, nick).await?;
    Ok(Reply::ok(format!("nickname changed to {nick}")))
}

async fn announce(session: &Session, nick: &str) -> Result<(), HandlerError> {
    let packet = session.hub.clientbound("connect", vec![nick.into()])?;
    session.hub.directory.broadcast(&packet, Some(session.id));
    Ok(())
}
