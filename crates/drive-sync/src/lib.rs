//! # Drive Sync
//!
//! The unified API for Drive sync: content-addressed packet storage,
//! checkpoint tracking and sync status.
//!
//! ## Overview
//!
//! - **Packets**: stored under a content identifier derived from their
//!   canonical bytes; pinned to retain, unpinned to release
//! - **Checkpoint**: how far the block-processing pipeline has advanced,
//!   written by a single writer
//! - **Status**: `initialSync`, `syncing` or `synced`, derived from one
//!   checkpoint and one fresh chain snapshot
//! - **Waiting**: resolve once the local tip reaches the chain tip
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drive_sync::{Drive, DriveConfig};
//! use drive_sync::chain::ledger::memory::MemoryLedger;
//! use drive_sync::core::Packet;
//! use drive_sync::store::{MemoryContentStore, SqliteCollection, CHECKPOINT_COLLECTION};
//!
//! async fn example() -> drive_sync::Result<()> {
//!     let config = DriveConfig::from_env()?;
//!     let collection = SqliteCollection::open("drive.db", CHECKPOINT_COLLECTION)?;
//!     let drive = Drive::new(MemoryContentStore::new(), collection, MemoryLedger::new(), config);
//!
//!     let id = drive.store_and_pin(&Packet::new(1, "app", "root")).await?;
//!     println!("stored {}", id);
//!
//!     match drive.ensure_ready().await {
//!         Ok(info) => println!("synced at {:?}", info.last_synced_block_hash),
//!         Err(e) => println!("{}: {}", e.code(), e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `drive_sync::core` - packets, identifiers, the checkpoint
//! - `drive_sync::store` - content and checkpoint persistence
//! - `drive_sync::chain` - ledger, watcher, coordinator, status

pub mod config;
pub mod drive;
pub mod error;
pub mod telemetry;

pub use config::DriveConfig;
pub use drive::Drive;
pub use error::{DriveError, Result};

pub use drive_sync_chain as chain;
pub use drive_sync_core as core;
pub use drive_sync_store as store;

pub use drive_sync_chain::{SyncInfo, SyncStatus};
pub use drive_sync_core::{ContentId, Packet, SyncCheckpoint};
