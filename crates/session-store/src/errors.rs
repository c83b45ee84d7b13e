use thiserror::Error;

use helmsman_core_types::HelmError;

/// Failures of the session snapshot store.
///
/// `Unavailable` is transient: the transition that triggered the write
/// is not committed and the caller should retry. `Codec` indicates a
/// snapshot that cannot be (de)serialized and is not retryable.
#[derive(Clone, Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot codec failure: {0}")]
    Codec(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value.to_string())
    }
}

impl From<StoreError> for HelmError {
    fn from(value: StoreError) -> Self {
        HelmError::new(value.to_string())
    }
}
