//! Error types for the Drive facade.

use drive_sync_chain::{LedgerError, SyncError, SyncStatus};
use drive_sync_core::CoreError;
use drive_sync_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Drive operations.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Local state has not caught up with the chain; try again later.
    #[error("drive is not ready: status is {status}")]
    NotReady { status: SyncStatus },

    /// Packet or identifier input error.
    #[error("invalid input: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Chain or sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// A status record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<LedgerError> for DriveError {
    fn from(e: LedgerError) -> Self {
        DriveError::Sync(SyncError::Ledger(e))
    }
}

impl DriveError {
    /// Stable code for request-serving surfaces.
    ///
    /// `NOT_READY` means "try later", `INVALID_INPUT` means the request
    /// itself is wrong, `TIMEOUT` is safe to retry.
    pub fn code(&self) -> &'static str {
        match self {
            DriveError::NotReady { .. } => "NOT_READY",
            DriveError::Core(_) | DriveError::Config(_) => "INVALID_INPUT",
            DriveError::Store(StoreError::Core(_)) => "INVALID_INPUT",
            DriveError::Store(e) if e.is_timeout() => "TIMEOUT",
            DriveError::Sync(SyncError::Deadline(_)) => "TIMEOUT",
            _ => "INTERNAL",
        }
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, DriveError::NotReady { .. })
    }
}

/// Result type for Drive operations.
pub type Result<T> = std::result::Result<T, DriveError>;
