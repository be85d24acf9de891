//! Error taxonomy shared by the store seam, the lifecycle protocol and the
//! retrieval engine.
//!
//! Not-found documents are never errors: lookups return `Ok(None)`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad construction input (empty bucket name, zero page size, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The store rejected or failed to acknowledge a call.
    #[error("store operation `{operation}` failed: {message}")]
    StoreOperation { operation: String, message: String },

    #[error("index `{0}` not found")]
    IndexNotFound(String),

    /// Optimistic-concurrency failure; retry with a fresh read.
    #[error("version conflict on `{index}/{id}`: expected {expected}, found {actual}")]
    VersionConflict {
        index: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Shortcut for a failed or unacknowledged store call.
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// True for conflicts a caller may retry after re-reading the document.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Fail the call unless the store acknowledged it.
pub fn check_ack(operation: &str, acknowledged: bool) -> StoreResult<()> {
    if acknowledged {
        Ok(())
    } else {
        Err(StoreError::operation(
            operation,
            "request was not acknowledged by the store",
        ))
    }
}
