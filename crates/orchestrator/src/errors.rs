use thiserror::Error;

use helmsman_core_types::HelmError;
use helmsman_session::InvalidTransition;
use helmsman_session_store::StoreError;

/// Caller-facing error taxonomy of the orchestration surface.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// A run is already live for this session id, or the id is taken.
    /// Returned synchronously, never persisted as a session fault.
    #[error("session already has an active run")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("invalid session state: {0}")]
    InvalidState(String),
    /// The store could not commit a transition. The session's persisted
    /// state is whatever was last durably written; retry when healthy.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// State-machine contract violation. A bug, not a user condition.
    #[error("internal fault: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }
}

impl From<InvalidTransition> for OrchestratorError {
    fn from(value: InvalidTransition) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<OrchestratorError> for HelmError {
    fn from(value: OrchestratorError) -> Self {
        HelmError::new(value.to_string())
    }
}
