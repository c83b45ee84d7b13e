use thiserror::Error;

use helmsman_core_types::HelmError;

use crate::machine::Trigger;
use crate::model::SessionStatus;

/// Contract violation in the state machine: the (status, trigger) pair
/// is not in the transition table. Indicates a programming error, never
/// a user-facing condition, and must not be swallowed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no transition from {status:?} on {trigger:?}")]
pub struct InvalidTransition {
    pub status: SessionStatus,
    pub trigger: Trigger,
}

impl From<InvalidTransition> for HelmError {
    fn from(value: InvalidTransition) -> Self {
        HelmError::new(value.to_string())
    }
}
