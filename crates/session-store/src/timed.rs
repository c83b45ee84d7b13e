use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use helmsman_core_types::SessionId;
use helmsman_session::Session;

use crate::api::{SessionStore, StoreResult};
use crate::errors::StoreError;

/// Bounds every store operation with a timeout so a stalled backend
/// cannot pin a session's worker indefinitely. An elapsed timeout is
/// reported as a transient `Unavailable`.
pub struct TimedSessionStore {
    inner: Arc<dyn SessionStore>,
    op_timeout: Duration,
}

impl TimedSessionStore {
    pub fn new(inner: Arc<dyn SessionStore>, op_timeout: Duration) -> Self {
        Self { inner, op_timeout }
    }

    fn elapsed(&self, op: &str) -> StoreError {
        StoreError::Unavailable(format!(
            "store {} timed out after {:?}",
            op, self.op_timeout
        ))
    }
}

#[async_trait]
impl SessionStore for TimedSessionStore {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        timeout(self.op_timeout, self.inner.get(id))
            .await
            .map_err(|_| self.elapsed("get"))?
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        timeout(self.op_timeout, self.inner.put(session))
            .await
            .map_err(|_| self.elapsed("put"))?
    }

    async fn delete(&self, id: &SessionId) -> StoreResult<bool> {
        timeout(self.op_timeout, self.inner.delete(id))
            .await
            .map_err(|_| self.elapsed("delete"))?
    }

    async fn list(&self) -> StoreResult<Vec<SessionId>> {
        timeout(self.op_timeout, self.inner.list())
            .await
            .map_err(|_| self.elapsed("list"))?
    }
}
