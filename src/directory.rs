//! Directory - the registry of active sessions.
//!
//! One `Directory` is shared by every connection task. It owns the
//! nickname index (uniqueness is enforced here, among active sessions
//! only) and the outgoing senders used for broadcast fan-out and
//! nickname-addressed delivery. Sessions are inserted when they complete
//! the connect handshake and removed on any close path.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use palaver_proto::Packet;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Unique id assigned to each accepted connection.
pub type SessionId = u64;

/// Requested nickname already belongs to an active session.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("nickname already in use")]
pub struct NickInUse;

/// An active session as seen by the rest of the server.
#[derive(Debug, Clone)]
pub struct Peer {
    /// Session id.
    pub id: SessionId,
    /// Nickname with the case the user chose.
    pub nick: String,
    /// Outgoing queue of the session's connection task.
    pub tx: mpsc::Sender<Packet>,
}

/// Shared registry of active sessions, keyed by session id with a
/// lowercase nickname index.
#[derive(Debug, Default)]
pub struct Directory {
    sessions: DashMap<SessionId, Peer>,
    nicks: DashMap<String, SessionId>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under `nick`.
    ///
    /// Fails when another active session already holds the nickname
    /// (case-insensitive). Reservation and insertion are atomic with
    /// respect to other callers racing for the same nickname.
    pub fn insert(
        &self,
        id: SessionId,
        nick: &str,
        tx: mpsc::Sender<Packet>,
    ) -> Result<(), NickInUse> {
        let key = nick.to_lowercase();
        match self.nicks.entry(key) {
            Entry::Occupied(_) => Err(NickInUse),
            Entry::Vacant(entry) => {
                entry.insert(id);
                self.sessions.insert(
                    id,
                    Peer {
                        id,
                        nick: nick.to_string(),
                        tx,
                    },
                );
                Ok(())
            }
        }
    }

    /// Remove a session, releasing its nickname. Returns the nick it held.
    pub fn remove(&self, id: SessionId) -> Option<String> {
        let (_, peer) = self.sessions.remove(&id)?;
        self.nicks.remove_if(&peer.nick.to_lowercase(), |_, held| *held == id);
        Some(peer.nick)
    }

    /// Change a session's nickname, keeping uniqueness.
    ///
    /// Renaming to the same nickname with different casing succeeds and
    /// updates the stored casing.
    pub fn rename(&self, id: SessionId, new_nick: &str) -> Result<(), NickInUse> {
        let new_key = new_nick.to_lowercase();

        let old_key = match self.sessions.get(&id) {
            Some(peer) => peer.nick.to_lowercase(),
            None => return Err(NickInUse),
        };

        if old_key != new_key {
            match self.nicks.entry(new_key) {
                Entry::Occupied(_) => return Err(NickInUse),
                Entry::Vacant(entry) => {
                    entry.insert(id);
                }
            }
            self.nicks.remove_if(&old_key, |_, held| *held == id);
        }

        if let Some(mut peer) = self.sessions.get_mut(&id) {
            peer.nick = new_nick.to_string();
        }
        Ok(())
    }

    /// Look up an active session by nickname, case-insensitively.
    pub fn find_by_nick(&self, nick: &str) -> Option<Peer> {
        let id = *self.nicks.get(&nick.to_lowercase())?;
        self.sessions.get(&id).map(|peer| peer.clone())
    }

    /// Whether `nick` is held by an active session.
    pub fn nick_in_use(&self, nick: &str) -> bool {
        self.nicks.contains_key(&nick.to_lowercase())
    }

    /// Nicknames of all active sessions, in no particular order.
    pub fn active_nicks(&self) -> Vec<String> {
        self.sessions.iter().map(|p| p.nick.clone()).collect()
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is active.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Queue `packet` to every active session except `skip`.
    ///
    /// Best-effort and non-blocking: a recipient that is gone, or whose
    /// queue is full because its connection task stopped draining, is
    /// skipped with a debug log. One stalled recipient never delays
    /// delivery to the rest and never fails the caller. Returns the number
    /// of sessions reached.
    pub fn broadcast(&self, packet: &Packet, skip: Option<SessionId>) -> usize {
        let mut delivered = 0;
        for peer in self.sessions.iter().filter(|p| Some(p.id) != skip) {
            match peer.tx.try_send(packet.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(id = peer.id, nick = %peer.nick, error = %err, "Broadcast recipient skipped");
                }
            }
        }
        delivered
    }
}
