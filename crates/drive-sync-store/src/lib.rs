//! # Drive Sync Store
//!
//! Persistence for Drive sync: content-addressed packets and the sync
//! checkpoint.
//!
//! ## Overview
//!
//! Two external systems sit behind traits so the sync core never depends
//! on a concrete backend:
//!
//! - [`ContentStore`] - a content-addressed block store with pinning
//! - [`DocumentCollection`] - a keyed JSON document collection
//!
//! On top of them:
//!
//! - [`PacketStore`] - store/retrieve/pin/unpin packets by [`ContentId`]
//! - [`CheckpointRepository`] - the checkpoint record
//! - [`CheckpointWriter`] - the single writer of the checkpoint
//! - [`CheckpointReader`] / [`CheckpointSource`] - read-only access
//!
//! [`SqliteCollection`] is the durable document backend; the `memory`
//! module has in-memory versions of both collaborators for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drive_sync_store::{
//!     CheckpointRepository, CheckpointWriter, MemoryContentStore, PacketStore,
//!     PacketStoreConfig, SqliteCollection, CHECKPOINT_COLLECTION,
//! };
//! use drive_sync_core::Packet;
//!
//! async fn example() -> drive_sync_store::Result<()> {
//!     let packets = PacketStore::new(MemoryContentStore::new(), PacketStoreConfig::default());
//!     let id = packets.store(&Packet::new(1, "app", "root")).await?;
//!     packets.pin(&id).await?;
//!
//!     let collection = SqliteCollection::open("drive.db", CHECKPOINT_COLLECTION)?;
//!     let repo = Arc::new(CheckpointRepository::new(collection));
//!     let mut writer = CheckpointWriter::open(repo, Default::default()).await?;
//!     writer.mark_synced(drive_sync_core::now_millis()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Timeouts are distinct**: retrieve and pin deadlines surface as their
//!   own error variants and the call may be retried.
//! - **Unpin is reconcilable**: "not pinned" is a dedicated error so cleanup
//!   can treat it as success.
//! - **One writer**: the repository refuses a second live writer.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod migration;
pub mod packets;
pub mod sqlite;
pub mod traits;

pub use checkpoint::{
    CheckpointReader, CheckpointRepository, CheckpointSource, CheckpointWriter,
    CheckpointWriterConfig, CHECKPOINT_COLLECTION, CHECKPOINT_RECORD_ID,
    DEFAULT_MAX_PROCESSED_BLOCKS,
};
pub use drive_sync_core::ContentId;
pub use error::{Result, StoreError};
pub use memory::{MemoryCollection, MemoryContentStore};
pub use packets::{PacketStore, PacketStoreConfig, DEFAULT_TIMEOUT};
pub use sqlite::SqliteCollection;
pub use traits::{ContentStore, DocumentCollection, PinEntry, PinKind};
