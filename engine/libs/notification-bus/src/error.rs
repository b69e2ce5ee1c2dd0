//! Error types for notification bus operations

use thiserror::Error;

/// Notification bus errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusError {
    /// The bus was shut down; no new subscriptions are accepted
    #[error("Notification bus is closed")]
    Closed,

    /// Topic name outside the bounded topic set
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(BusError::Closed.to_string(), "Notification bus is closed");
        assert_eq!(
            BusError::UnknownTopic("postDeleted".to_string()).to_string(),
            "Unknown topic: postDeleted"
        );
    }
}
