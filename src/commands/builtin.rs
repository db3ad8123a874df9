//! The built-in command set and its execution.
//!
//! Each command is declared as a [`CommandDescriptor`] carrying a
//! [`CommandKind`]; execution matches on the kind, so adding a command means
//! adding an enum variant, a descriptor and a match arm. There is no string
//! dispatch past keyword resolution.

use tracing::info;

use crate::handlers::{self, status, HandlerError, Reply};
use crate::session::Session;

use super::{ArgSpec, ArgType, ArgValue, Args, CommandDescriptor};

/// The closed set of built-in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Toggle or set per-session debug mode.
    DebugMode,
    /// Send a direct message.
    Message,
    /// Change nickname, or report the current one.
    Connect,
    /// Leave the server.
    Exit,
    /// List commands or describe one.
    Help,
    /// Broadcast a third-person action.
    Emote,
    /// List active users.
    Who,
    /// Create an account.
    Register,
    /// Authenticate against an existing account.
    Login,
}

/// Descriptors for every built-in command.
pub(super) fn descriptors() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor {
            keyword: "debugmode",
            aliases: &[],
            args: vec![ArgSpec::optional_or(
                "state",
                ArgType::Choice(&["on", "off", "toggle"]),
                ArgValue::Str("toggle".to_string()),
            )],
            kind: CommandKind::DebugMode,
            help: "toggle or set per-session debug mode",
        },
        CommandDescriptor {
            keyword: "message",
            aliases: &["msg", "dm", "pm", "w"],
            args: vec![
                ArgSpec::required("target", ArgType::Str),
                ArgSpec::required("content", ArgType::Remainder),
            ],
            kind: CommandKind::Message,
            help: "send a direct message to a user",
        },
        CommandDescriptor {
            keyword: "connect",
            aliases: &["nick"],
            args: vec![ArgSpec::optional("nickname", ArgType::Str)],
            kind: CommandKind::Connect,
            help: "change nickname, or show the current one",
        },
        CommandDescriptor {
            keyword: "exit",
            aliases: &["l", "disconnect", "quit"],
            args: vec![ArgSpec::optional("message", ArgType::Remainder)],
            kind: CommandKind::Exit,
            help: "disconnect from the server",
        },
        CommandDescriptor {
            keyword: "help",
            aliases: &["h"],
            args: vec![ArgSpec::optional("command", ArgType::Str)],
            kind: CommandKind::Help,
            help: "list commands, or describe one",
        },
        CommandDescriptor {
            keyword: "emote",
            aliases: &["me"],
            args: vec![ArgSpec::required("content", ArgType::Remainder)],
            kind: CommandKind::Emote,
            help: "broadcast a third-person action",
        },
        CommandDescriptor {
            keyword: "who",
            aliases: &["users"],
            args: vec![],
            kind: CommandKind::Who,
            help: "list active users",
        },
        CommandDescriptor {
            keyword: "register",
            aliases: &[],
            args: vec![
                ArgSpec::required("username", ArgType::Str),
                ArgSpec::required("password", ArgType::Str),
            ],
            kind: CommandKind::Register,
            help: "create an account",
        },
        CommandDescriptor {
            keyword: "login",
            aliases: &[],
            args: vec![
                ArgSpec::required("username", ArgType::Str),
                ArgSpec::required("password", ArgType::Str),
            ],
            kind: CommandKind::Login,
            help: "authenticate against an existing account",
        },
    ]
}

/// Execute a validated command invocation.
pub async fn execute(
    kind: CommandKind,
    session: &mut Session,
    args: &Args,
) -> Result<Reply, HandlerError> {
    match kind {
        CommandKind::DebugMode => {
            session.debug = match args.str("state") {
                Some("on") => true,
                Some("off") => false,
                _ => !session.debug,
            };
            info!(id = session.id, debug = session.debug, "Debug mode changed");
            Ok(Reply::ok(format!(
                "debug mode {}",
                if session.debug { "on" } else { "off" }
            )))
        }

        CommandKind::Message => {
            let target = args.str("target").unwrap_or_default().to_string();
            let content = args.str("content").unwrap_or_default().to_string();
            handlers::messaging::send_direct(session, &target, &content).await
        }

        CommandKind::Connect => match args.str("nickname") {
            Some(nick) => {
                let nick = nick.to_string();
                handlers::connect::change_nick(session, &nick).await
            }
            None => {
                let nick = session.nick_or_malformed()?.to_string();
                let detail = match &session.authed_as {
                    Some(account) => format!("connected as {nick}, logged in as {account}"),
                    None => format!("connected as {nick}"),
                };
                Ok(Reply::ok(detail))
            }
        },

        CommandKind::Exit => {
            let reason = args.str("message").map(str::to_string);
            Err(HandlerError::Quit(reason))
        }

        CommandKind::Help => match args.str("command") {
            Some(keyword) => match session.hub.commands.resolve(keyword) {
                Some(descriptor) => Ok(Reply::ok(format!(
                    "{} - {}",
                    descriptor.usage(),
                    descriptor.help
                ))),
                None => Ok(Reply::err(
                    status::UNKNOWN_COMMAND,
                    format!("unknown command {keyword:?}"),
                )),
            },
            None => {
                let listing: Vec<String> = session
                    .hub
                    .commands
                    .all()
                    .iter()
                    .map(|d| d.usage())
                    .collect();
                Ok(Reply::ok(listing.join(", ")))
            }
        },

        CommandKind::Emote => {
            let content = args.str("content").unwrap_or_default().to_string();
            handlers::messaging::broadcast_chat(session, "emote", &content).await
        }

        CommandKind::Who => {
            let mut nicks = session.hub.directory.active_nicks();
            nicks.sort();
            Ok(Reply::ok(format!(
                "{} online: {}",
                nicks.len(),
                nicks.join(", ")
            )))
        }

        CommandKind::Register => {
            let username = args.str("username").unwrap_or_default();
            let password = args.str("password").unwrap_or_default();
            if session.hub.db.register(username, password).await? {
                info!(id = session.id, %username, "Account registered");
                Ok(Reply::ok(format!("account {username:?} created")))
            } else {
                Ok(Reply::err(
                    status::AUTH_FAILED,
                    format!("account {username:?} already exists"),
                ))
            }
        }

        CommandKind::Login => {
            let username = args.str("username").unwrap_or_default();
            let password = args.str("password").unwrap_or_default();
            if session.hub.db.verify(username, password).await? {
                session.authed_as = Some(username.to_string());
                info!(id = session.id, %username, "Login succeeded");
                Ok(Reply::ok(format!("logged in as {username}")))
            } else {
                Ok(Reply::err(status::AUTH_FAILED, "invalid credentials"))
            }
        }
    }
}
