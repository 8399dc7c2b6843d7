//! Error types for chain observation and sync coordination.

use std::sync::Arc;
use std::time::Duration;

use drive_sync_store::StoreError;
use thiserror::Error;

/// Errors reported by a ledger client.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger answered with an error.
    #[error("ledger rpc error: {0}")]
    Rpc(String),
}

/// Errors that can occur while observing or waiting for sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Querying the ledger failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Loading the checkpoint failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The change watcher reported a failed reload.
    #[error("checkpoint watch failed: {0}")]
    Watch(Arc<StoreError>),

    /// Sync was not reached before the deadline.
    #[error("sync not reached within {0:?}")]
    Deadline(Duration),

    /// The change watcher went away while a wait was pending.
    #[error("change watcher closed")]
    WatcherClosed,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
