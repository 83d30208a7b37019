//! Conversation state: waiting continuations and the last command
//!
//! At most one waiting record exists per (chat, user); reading and
//! consuming it must be atomic against other events of the same identity
//! arriving close together (rapid double-taps), while events of different
//! identities never block each other. A sharded map of per-identity async
//! mutexes gives exactly that: the decision "is there a wait, and do I
//! consume it" happens under the identity's own lock and nothing wider.

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::{AppError, AppResult};
use crate::dispatch::event::Identity;
use crate::dispatch::registry::CommandId;
use crate::storage::db::{self, DbPool};

/// A pending continuation, parsed out of its storage row.
#[derive(Debug, Clone)]
pub struct WaitingRecord {
    pub command: CommandId,
    pub partial_text: String,
}

/// Waiting-state and last-command persistence with per-identity locking.
pub struct StateStore {
    db_pool: Arc<DbPool>,
    locks: DashMap<Identity, Arc<Mutex<()>>>,
}

impl StateStore {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            locks: DashMap::new(),
        }
    }

    /// Acquires this identity's lock. Hold the guard across a waiting-state
    /// read and the write that consumes or replaces it.
    pub async fn lock(&self, identity: Identity) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(identity)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Reads the waiting record for an identity, if any.
    ///
    /// A stored command name that no longer parses means the record was
    /// written by an incompatible version; that is corrupted state, not a
    /// missing record.
    pub fn get_waiting(&self, identity: Identity) -> AppResult<Option<WaitingRecord>> {
        let conn = db::get_connection(&self.db_pool)?;
        let row = db::get_waiting_state(&conn, identity.chat_id, identity.user_id)?;

        match row {
            None => Ok(None),
            Some(state) => {
                let command = CommandId::from_str(&state.command).map_err(|_| {
                    AppError::Internal(format!(
                        "corrupted waiting state for chat {} user {}: unknown command '{}'",
                        identity.chat_id, identity.user_id, state.command
                    ))
                })?;
                Ok(Some(WaitingRecord {
                    command,
                    partial_text: state.partial_text,
                }))
            }
        }
    }

    /// Upserts the waiting record. A prior record for the same identity is
    /// replaced; only one continuation can be pending at a time.
    pub fn put_waiting(&self, identity: Identity, command: CommandId, partial_text: &str) -> AppResult<()> {
        let conn = db::get_connection(&self.db_pool)?;
        db::put_waiting_state(&conn, identity.chat_id, identity.user_id, command.key(), partial_text)?;
        Ok(())
    }

    pub fn remove_waiting(&self, identity: Identity) -> AppResult<()> {
        let conn = db::get_connection(&self.db_pool)?;
        db::remove_waiting_state(&conn, identity.chat_id, identity.user_id)?;
        Ok(())
    }

    /// Last successfully run command of a chat. An unparseable stored name
    /// (from a renamed command) reads as "nothing to repeat".
    pub fn last_command(&self, chat_id: i64) -> AppResult<Option<CommandId>> {
        let conn = db::get_connection(&self.db_pool)?;
        let stored = db::get_last_command(&conn, chat_id)?;
        Ok(stored.and_then(|name| CommandId::from_str(&name).ok()))
    }

    pub fn set_last_command(&self, chat_id: i64, command: CommandId) -> AppResult<()> {
        let conn = db::get_connection(&self.db_pool)?;
        db::set_last_command(&conn, chat_id, command.key())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let pool = Arc::new(db::create_pool(path.to_str().unwrap()).unwrap());
        (dir, StateStore::new(pool))
    }

    fn identity() -> Identity {
        Identity { user_id: 10, chat_id: 1 }
    }

    #[tokio::test]
    async fn test_waiting_roundtrip() {
        let (_dir, store) = store();

        assert!(store.get_waiting(identity()).unwrap().is_none());

        store.put_waiting(identity(), CommandId::Weather, "").unwrap();
        let record = store.get_waiting(identity()).unwrap().unwrap();
        assert_eq!(record.command, CommandId::Weather);
        assert_eq!(record.partial_text, "");

        store.remove_waiting(identity()).unwrap();
        assert!(store.get_waiting(identity()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_wait_replaces_old() {
        let (_dir, store) = store();

        store.put_waiting(identity(), CommandId::Weather, "").unwrap();
        store.put_waiting(identity(), CommandId::Echo, "so far").unwrap();

        let record = store.get_waiting(identity()).unwrap().unwrap();
        assert_eq!(record.command, CommandId::Echo);
        assert_eq!(record.partial_text, "so far");
    }

    #[tokio::test]
    async fn test_corrupted_waiting_command_is_internal_error() {
        let (_dir, store) = store();

        let conn = db::get_connection(&store.db_pool).unwrap();
        db::put_waiting_state(&conn, 1, 10, "no-such-command", "").unwrap();
        drop(conn);

        let err = store.get_waiting(identity()).unwrap_err();
        assert_eq!(err.kind(), "internal");
    }

    #[tokio::test]
    async fn test_last_command_roundtrip() {
        let (_dir, store) = store();

        assert!(store.last_command(1).unwrap().is_none());
        store.set_last_command(1, CommandId::Weather).unwrap();
        assert_eq!(store.last_command(1).unwrap(), Some(CommandId::Weather));
    }

    #[tokio::test]
    async fn test_identity_locks_are_independent() {
        let (_dir, store) = store();

        let a = store.lock(Identity { user_id: 1, chat_id: 1 }).await;
        // A different identity must not block even while `a` is held.
        let b = store.lock(Identity { user_id: 2, chat_id: 1 }).await;
        drop(a);
        drop(b);
    }
}
