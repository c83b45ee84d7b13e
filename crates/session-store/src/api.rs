use async_trait::async_trait;
use dashmap::DashMap;

use helmsman_core_types::SessionId;
use helmsman_session::Session;

use crate::errors::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store for session snapshots.
///
/// `get` after a completed `put` for the same id must observe that put
/// (read-after-write per session); no cross-session ordering is
/// required or assumed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>>;
    async fn put(&self, session: &Session) -> StoreResult<()>;
    async fn delete(&self, id: &SessionId) -> StoreResult<bool>;
    async fn list(&self) -> StoreResult<Vec<SessionId>>;
}

/// In-process store holding serialized snapshots.
///
/// Snapshots round-trip through the JSON codec on every access so this
/// tier honors the same contract as a remote key-value backend: callers
/// get an independent copy, never a shared reference.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<SessionId, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        match self.entries.get(id) {
            Some(entry) => Ok(Some(serde_json::from_str(entry.value())?)),
            None => Ok(None),
        }
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        let encoded = serde_json::to_string(session)?;
        self.entries.insert(session.id.clone(), encoded);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> StoreResult<bool> {
        Ok(self.entries.remove(id).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<SessionId>> {
        Ok(self.entries.iter().map(|entry| entry.key().clone()).collect())
    }
}
