//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt value under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Redis(_) => "redis",
            StoreError::Io(_) => "io",
            StoreError::Serialization(_) => "serialization",
            StoreError::Corrupt { .. } => "corrupt",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Corrupt {
            key: "userPosts_u1".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt value under userPosts_u1: expected value"
        );
        assert_eq!(err.kind(), "corrupt");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert_eq!(err.kind(), "serialization");
    }
}
