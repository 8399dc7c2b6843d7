//! # Drive Sync Chain
//!
//! Everything that compares local progress with the ledger.
//!
//! ## Overview
//!
//! - [`Ledger`] - the ledger client interface (tip and sync flag)
//! - [`ChainObserver`] - a fresh [`ChainSnapshot`] per call
//! - [`ChangeWatcher`] - polls the checkpoint and broadcasts [`WatchEvent`]s
//! - [`SyncCoordinator`] - waits until the local tip reaches the chain tip
//! - [`SyncInfo`] / [`SyncStatus`] - the status read model
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drive_sync_chain::{
//!     ChainObserver, ChangeWatcher, SyncCoordinator, WatcherConfig,
//!     ledger::memory::MemoryLedger,
//! };
//! use drive_sync_store::{CheckpointRepository, MemoryCollection};
//!
//! async fn example() -> drive_sync_chain::Result<()> {
//!     let repo = Arc::new(CheckpointRepository::new(MemoryCollection::new()));
//!     let watcher = Arc::new(ChangeWatcher::new(repo, WatcherConfig::default()));
//!     let coordinator = SyncCoordinator::new(ChainObserver::new(MemoryLedger::new()), watcher);
//!
//!     let checkpoint = coordinator.await_sync().await?;
//!     println!("synced at {:?}", checkpoint.tip_hash());
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No caching**: snapshots and checkpoints are reloaded for every
//!   decision.
//! - **Single timer**: a watcher never runs two polling tasks.

pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod observer;
pub mod status;
pub mod watcher;

pub use coordinator::SyncCoordinator;
pub use error::{LedgerError, Result, SyncError};
pub use ledger::{ChainTip, Ledger};
pub use observer::{ChainObserver, ChainSnapshot};
pub use status::{SyncInfo, SyncStatus};
pub use watcher::{ChangeWatcher, WatchEvent, WatcherConfig, DEFAULT_WATCH_INTERVAL};
