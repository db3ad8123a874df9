//! Slash-command packet handling.
//!
//! A `command` packet carries a keyword plus a raw argument string. The
//! keyword resolves through the command registry; the raw string is split
//! on whitespace and validated against the command's declared arguments
//! before execution. Validation failures are reported to the invoking user
//! as a usage message, never as a dropped connection.

use palaver_proto::Packet;
use tracing::debug;

use crate::commands;
use crate::session::Session;

use super::{status, HandlerError, Reply};

/// Handle a serverbound `command`.
pub async fn handle(session: &mut Session, packet: &Packet) -> Result<Reply, HandlerError> {
    let keyword = packet
        .str_field("keyword")
        .ok_or(HandlerError::Malformed("command without keyword"))?
        .to_string();
    let raw = packet
        .str_field("args")
        .ok_or(HandlerError::Malformed("command without args"))?
        .to_string();

    let Some(descriptor) = session.hub.commands.resolve(&keyword) else {
        return Ok(Reply::err(
            status::UNKNOWN_COMMAND,
            format!("unknown command {keyword:?}"),
        ));
    };

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let args = match descriptor.validate(&tokens) {
        Ok(args) => args,
        Err(err) => {
            return Ok(Reply::err(
                status::BAD_ARGUMENT,
                format!("{err}; usage: {}", descriptor.usage()),
            ));
        }
    };

    debug!(id = session.id, keyword = %descriptor.keyword, "Executing command");
    let kind = descriptor.kind;
    commands::execute(kind, session, &args).await
}
