use thiserror::Error;

use helmsman_core_types::HelmError;

/// Failure reported by the browser action capability.
///
/// The capability classifies its own failures; the executor is
/// policy-agnostic beyond the `retryable` flag.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct ActionFault {
    pub reason: String,
    pub retryable: bool,
}

impl ActionFault {
    /// Transient fault worth retrying (timeouts, flaky navigation).
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: true,
        }
    }

    /// Permanent fault (bad selector, element gone for good).
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: false,
        }
    }
}

impl From<ActionFault> for HelmError {
    fn from(value: ActionFault) -> Self {
        HelmError::new(value.to_string())
    }
}
