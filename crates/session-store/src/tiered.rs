use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use helmsman_core_types::SessionId;
use helmsman_session::Session;

use crate::api::{SessionStore, StoreResult};

/// Cache tier in front of a durable tier.
///
/// Writes go through both; a put is only acknowledged once the durable
/// tier has it, so a process restart always finds the last committed
/// snapshot. Reads prefer the cache and repopulate it from the durable
/// tier on a miss.
pub struct TieredSessionStore {
    cache: Arc<dyn SessionStore>,
    durable: Arc<dyn SessionStore>,
}

impl TieredSessionStore {
    pub fn new(cache: Arc<dyn SessionStore>, durable: Arc<dyn SessionStore>) -> Self {
        Self { cache, durable }
    }
}

#[async_trait]
impl SessionStore for TieredSessionStore {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        match self.cache.get(id).await {
            Ok(Some(session)) => return Ok(Some(session)),
            Ok(None) => {}
            Err(err) => warn!(target: "session_store", session = %id, error = %err, "cache read failed, falling back to durable tier"),
        }

        let session = self.durable.get(id).await?;
        if let Some(session) = &session {
            // Best effort: a failed repopulation only costs the next read.
            if let Err(err) = self.cache.put(session).await {
                warn!(target: "session_store", session = %id, error = %err, "cache repopulation failed");
            }
        }
        Ok(session)
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        self.durable.put(session).await?;
        if let Err(err) = self.cache.put(session).await {
            warn!(target: "session_store", session = %session.id, error = %err, "cache write failed after durable commit");
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> StoreResult<bool> {
        let cached = self.cache.delete(id).await.unwrap_or(false);
        let durable = self.durable.delete(id).await?;
        Ok(cached || durable)
    }

    async fn list(&self) -> StoreResult<Vec<SessionId>> {
        self.durable.list().await
    }
}
