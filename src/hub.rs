//! Hub - shared server state handed to every connection task.
//!
//! Owns the directory of active sessions, the read-only packet schema, the
//! command registry, the credential store and the effective limits. Built
//! once in `main` and passed around as `Arc<Hub>`; nothing here is global
//! mutable state.

use palaver_proto::{Direction, FieldValue, Packet, ProtocolError, SchemaRegistry};
use std::sync::Arc;

use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::db::Database;
use crate::directory::Directory;

/// Shared server state.
pub struct Hub {
    /// Server name announced in system messages.
    pub server_name: String,
    /// Registry of active sessions.
    pub directory: Directory,
    /// Read-only packet schema.
    pub schema: Arc<SchemaRegistry>,
    /// Registered slash commands.
    pub commands: CommandRegistry,
    /// Credential store.
    pub db: Database,
    /// Maximum accepted chat message length in bytes.
    pub max_message_len: usize,
    /// Maximum accepted frame length in bytes.
    pub max_frame_len: usize,
    /// Idle timeout in seconds.
    pub idle_secs: u64,
}

impl Hub {
    /// Assemble the hub from loaded configuration and collaborators.
    pub fn new(
        config: &Config,
        schema: Arc<SchemaRegistry>,
        commands: CommandRegistry,
        db: Database,
    ) -> Self {
        Self {
            server_name: config.server.name.clone(),
            directory: Directory::new(),
            schema,
            commands,
            db,
            max_message_len: config.limits.max_message_len,
            max_frame_len: config.limits.max_frame_len,
            idle_secs: config.timeouts.idle_secs,
        }
    }

    /// Build a clientbound packet by schema name.
    ///
    /// Field values must be given in schema order. Fails only when the name
    /// is absent from the clientbound namespace or the arity is wrong, both
    /// of which are programming errors surfaced at the call site.
    pub fn clientbound(&self, name: &str, values: Vec<FieldValue>) -> Result<Packet, ProtocolError> {
        let desc = self
            .schema
            .by_name(Direction::Clientbound, name)
            .ok_or_else(|| ProtocolError::UnknownPacketName {
                name: name.to_string(),
                direction: Direction::Clientbound,
            })?;
        Packet::with_fields(Arc::clone(desc), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clientbound_unknown_name_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("users.db")).await.unwrap();
        let hub = Hub::new(
            &Config::default(),
            Arc::new(SchemaRegistry::builtin().unwrap()),
            CommandRegistry::builtin().unwrap(),
            db,
        );

        let err = hub.clientbound("teleport", vec![]).unwrap_err();
        match err {
            ProtocolError::UnknownPacketName { name, direction } => {
                assert_eq!(name, "teleport");
                assert_eq!(direction, Direction::Clientbound);
            }
            other => panic!("expected UnknownPacketName error, got {other:?}"),
        }
    }
}
