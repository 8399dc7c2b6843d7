//! Error types for the store module.

use drive_sync_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Content not found in the content store.
    #[error("content not found: {0}")]
    NotFound(String),

    /// Unpin of content that was not pinned.
    ///
    /// Benign during reconciliation: callers cleaning up speculatively treat
    /// it as success.
    #[error("content not pinned: {0}")]
    NotPinned(String),

    /// The content store did not answer a retrieve in time.
    #[error("retrieve of {address} timed out after {timeout_ms}ms")]
    RetrieveTimeout { address: String, timeout_ms: u64 },

    /// The content store did not answer a pin in time.
    #[error("pin of {address} timed out after {timeout_ms}ms")]
    PinTimeout { address: String, timeout_ms: u64 },

    /// Stored bytes do not hash to the address they were fetched by.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another checkpoint writer is alive.
    #[error("checkpoint writer already claimed")]
    WriterClaimed,

    /// Any other failure reported by a collaborator.
    #[error("backend error: {0}")]
    Backend(String),

    /// Packet encoding or identifier error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// True for the reconciliation-benign "was not pinned" signal.
    pub fn is_not_pinned(&self) -> bool {
        matches!(self, StoreError::NotPinned(_))
    }

    /// True for deadline expiry; the operation may still be in flight and
    /// is safe to retry.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            StoreError::RetrieveTimeout { .. } | StoreError::PinTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
