/// Error types for feed-engine
use notification_bus::BusError;
use partition_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification bus error: {0}")]
    Bus(#[from] BusError),

    /// Post, comment or reply id not present in the merged feed
    #[error("Not found: {0}")]
    LookupMiss(String),

    #[error("Authorship violation: {actor} is not the author of {target}")]
    AuthorshipViolation { actor: String, target: String },

    #[error("Catalog post is read-only: {0}")]
    CatalogReadOnly(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub fn lookup_miss(what: &str, id: &str) -> Self {
        EngineError::LookupMiss(format!("{} {}", what, id))
    }

    /// Recoverable errors that are expected during normal use
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::LookupMiss(_)
                | EngineError::AuthorshipViolation { .. }
                | EngineError::CatalogReadOnly(_)
                | EngineError::InvalidInput(_)
        )
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
