use crate::record::TestStatus;

/// All errors that can be returned by version stores, assignment
/// stores, and the A/B test manager.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Bad input shape: empty content, invalid traffic split,
    /// deleting an active version, confidence out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Reference to an unknown version, test, or assignment.
    #[error("not found: {0}")]
    NotFound(String),

    /// Variant assignment was requested on a test that is not
    /// effectively running.
    #[error("ab test '{test_id}' is not running")]
    TestNotRunning { test_id: String },

    /// A/B test state machine violation.
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: TestStatus, to: TestStatus },

    /// Filesystem failure in the file-backed adapter.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}
