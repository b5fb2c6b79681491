use sked_core::RuleError;
use sked_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("task title not specified")]
    MissingTitle,

    #[error("task id not specified")]
    MissingId,

    #[error("invalid task id: {0}")]
    InvalidId(String),
}

impl EngineError {
    /// Whether the failure was caused by the request itself rather than by
    /// storage.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Rule(_) | Self::MissingTitle | Self::MissingId | Self::InvalidId(_) => true,
            Self::Store(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound(_)))
    }
}
