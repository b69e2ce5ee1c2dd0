pub mod comments;
pub mod engagement;
pub mod posts;

pub use comments::{CommentTreeManager, NodeRef};
pub use engagement::{EngagementKind, EngagementSetManager};
pub use posts::{FeedRepository, Persist};

use crate::error::EngineError;
use tracing::{debug, error, warn};

/// Log an error absorbed at a manager boundary
pub(crate) fn log_absorbed(operation: &'static str, err: &EngineError) {
    match err {
        EngineError::LookupMiss(_) => debug!(operation, error = %err, "Lookup miss ignored"),
        e if e.is_recoverable() => warn!(operation, error = %err, "Operation rejected"),
        _ => error!(operation, error = %err, "Operation failed"),
    }
}
