//! Persistence of the sync checkpoint.
//!
//! The checkpoint is a single record in a document collection. Exactly one
//! [`CheckpointWriter`] may be alive per repository; everything else reads
//! through [`CheckpointSource`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use drive_sync_core::{ProcessedBlock, SyncCheckpoint};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::traits::DocumentCollection;

/// Collection holding the checkpoint record.
pub const CHECKPOINT_COLLECTION: &str = "sync_state";

/// Identifier of the checkpoint record.
pub const CHECKPOINT_RECORD_ID: &str = "sync_checkpoint";

/// Default number of processed blocks kept in the checkpoint.
pub const DEFAULT_MAX_PROCESSED_BLOCKS: usize = 100;

/// Loads, saves and resets the checkpoint record.
pub struct CheckpointRepository<C: DocumentCollection> {
    collection: C,
    writer_claimed: AtomicBool,
}

impl<C: DocumentCollection> CheckpointRepository<C> {
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            writer_claimed: AtomicBool::new(false),
        }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Load the checkpoint. A missing record is the empty checkpoint.
    pub async fn load(&self) -> Result<SyncCheckpoint> {
        match self.collection.find_one(CHECKPOINT_RECORD_ID).await? {
            Some(doc) => {
                let mut checkpoint: SyncCheckpoint = serde_json::from_value(doc)?;
                checkpoint.keep_initial_sync_at(None);
                Ok(checkpoint)
            }
            None => Ok(SyncCheckpoint::empty()),
        }
    }

    /// Persist `checkpoint`, returning what was stored.
    ///
    /// An initial sync time already on record is never overwritten. Only
    /// [`CheckpointWriter`] calls this.
    pub(crate) async fn save(&self, checkpoint: &SyncCheckpoint) -> Result<SyncCheckpoint> {
        let stored = self.load().await?;
        let mut next = checkpoint.clone();
        next.keep_initial_sync_at(stored.last_initial_sync_at());

        let doc = serde_json::to_value(&next)?;
        self.collection.upsert(CHECKPOINT_RECORD_ID, doc).await?;
        Ok(next)
    }

    /// Delete the record; the next load yields the empty checkpoint.
    pub(crate) async fn reset(&self) -> Result<()> {
        self.collection.delete(CHECKPOINT_RECORD_ID).await?;
        Ok(())
    }
}

/// Read-only access to the current checkpoint.
#[async_trait]
pub trait CheckpointSource: Send + Sync {
    async fn load(&self) -> Result<SyncCheckpoint>;
}

#[async_trait]
impl<C: DocumentCollection> CheckpointSource for CheckpointRepository<C> {
    async fn load(&self) -> Result<SyncCheckpoint> {
        CheckpointRepository::load(self).await
    }
}

#[async_trait]
impl<T: CheckpointSource + ?Sized> CheckpointSource for Arc<T> {
    async fn load(&self) -> Result<SyncCheckpoint> {
        (**self).load().await
    }
}

/// A cloneable, read-only handle on a repository.
pub struct CheckpointReader<C: DocumentCollection> {
    repo: Arc<CheckpointRepository<C>>,
}

impl<C: DocumentCollection> CheckpointReader<C> {
    pub fn new(repo: Arc<CheckpointRepository<C>>) -> Self {
        Self { repo }
    }
}

impl<C: DocumentCollection> Clone for CheckpointReader<C> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

#[async_trait]
impl<C: DocumentCollection> CheckpointSource for CheckpointReader<C> {
    async fn load(&self) -> Result<SyncCheckpoint> {
        self.repo.load().await
    }
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct CheckpointWriterConfig {
    /// Processed blocks kept after each apply. `None` keeps all.
    pub max_processed_blocks: Option<usize>,
}

impl Default for CheckpointWriterConfig {
    fn default() -> Self {
        Self {
            max_processed_blocks: Some(DEFAULT_MAX_PROCESSED_BLOCKS),
        }
    }
}

/// The single writer of the checkpoint.
///
/// Every mutation is applied to a copy, persisted, and only then adopted,
/// so a failed save leaves the writer's view equal to what is stored.
/// Dropping the writer releases the claim on the repository.
pub struct CheckpointWriter<C: DocumentCollection> {
    repo: Arc<CheckpointRepository<C>>,
    checkpoint: SyncCheckpoint,
    config: CheckpointWriterConfig,
}

impl<C: DocumentCollection> CheckpointWriter<C> {
    /// Claim the repository and load the stored checkpoint.
    ///
    /// Fails with [`StoreError::WriterClaimed`] while another writer lives.
    pub async fn open(
        repo: Arc<CheckpointRepository<C>>,
        config: CheckpointWriterConfig,
    ) -> Result<Self> {
        if repo.writer_claimed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::WriterClaimed);
        }

        match repo.load().await {
            Ok(checkpoint) => Ok(Self {
                repo,
                checkpoint,
                config,
            }),
            Err(e) => {
                repo.writer_claimed.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// The checkpoint as last persisted by this writer.
    pub fn checkpoint(&self) -> &SyncCheckpoint {
        &self.checkpoint
    }

    /// A read-only handle on the same repository.
    pub fn reader(&self) -> CheckpointReader<C> {
        CheckpointReader::new(self.repo.clone())
    }

    async fn commit(&mut self, next: SyncCheckpoint) -> Result<()> {
        self.checkpoint = self.repo.save(&next).await?;
        Ok(())
    }

    /// Record a newly processed block above the current tip.
    pub async fn apply_block(&mut self, block: ProcessedBlock) -> Result<()> {
        let mut next = self.checkpoint.clone();
        debug!(%block, "applying block to checkpoint");
        next.push_block(block)?;
        if let Some(limit) = self.config.max_processed_blocks {
            next.retain_last(limit);
        }
        self.commit(next).await
    }

    /// Roll back to `height`, returning the orphaned blocks.
    pub async fn rollback_to(&mut self, height: u64) -> Result<Vec<ProcessedBlock>> {
        let mut next = self.checkpoint.clone();
        let orphaned = next.rollback_to(height);
        if orphaned.is_empty() {
            return Ok(orphaned);
        }

        info!(height, orphaned = orphaned.len(), "rolled back checkpoint");
        self.commit(next).await?;
        Ok(orphaned)
    }

    /// Record a completed sync at `at` (Unix ms).
    ///
    /// The first call also records the initial sync time.
    pub async fn mark_synced(&mut self, at: i64) -> Result<()> {
        let mut next = self.checkpoint.clone();
        let initial = !next.has_synced();
        next.set_last_sync_at(at);
        self.commit(next).await?;
        if initial {
            info!(at, "initial sync completed");
        }
        Ok(())
    }

    /// Erase the stored checkpoint.
    pub async fn reset(&mut self) -> Result<()> {
        self.repo.reset().await?;
        self.checkpoint = SyncCheckpoint::empty();
        info!("checkpoint reset");
        Ok(())
    }
}

impl<C: DocumentCollection> Drop for CheckpointWriter<C> {
    fn drop(&mut self) {
        self.repo.writer_claimed.store(false, Ordering::SeqCst);
    }
}
