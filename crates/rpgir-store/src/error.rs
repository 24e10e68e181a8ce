//! Storage error types.

use thiserror::Error;

/// Errors produced by document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document has been created yet.
    #[error("no document found in store")]
    NotFound,

    /// Compare-and-swap failure: the stored revision moved underneath us.
    #[error("revision conflict: expected rev {expected}, store has rev {actual}")]
    RevisionConflict { expected: u64, actual: u64 },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
