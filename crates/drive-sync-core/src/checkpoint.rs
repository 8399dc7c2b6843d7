//! Sync checkpoint: how far local block processing has advanced.
//!
//! The checkpoint is the durable record the block-processing pipeline
//! updates after every applied or rolled-back block. Everything else only
//! reads it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// A block the local pipeline has processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessedBlock {
    pub height: u64,
    pub hash: String,
}

impl ProcessedBlock {
    pub fn new(height: u64, hash: impl Into<String>) -> Self {
        Self {
            height,
            hash: hash.into(),
        }
    }
}

impl fmt::Display for ProcessedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.hash, self.height)
    }
}

/// Persisted sync state.
///
/// Timestamps are Unix milliseconds. Two checkpoints are equal when every
/// field is equal; the change watcher relies on that comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    #[serde(default)]
    processed_blocks: Vec<ProcessedBlock>,
    #[serde(default)]
    last_sync_at: Option<i64>,
    #[serde(default)]
    last_initial_sync_at: Option<i64>,
}

impl SyncCheckpoint {
    /// The checkpoint of a node that has never processed anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild a checkpoint from stored fields.
    ///
    /// A sync time without an initial sync time takes the sync time as the
    /// initial one.
    pub fn from_parts(
        processed_blocks: Vec<ProcessedBlock>,
        last_sync_at: Option<i64>,
        last_initial_sync_at: Option<i64>,
    ) -> Self {
        Self {
            processed_blocks,
            last_sync_at,
            last_initial_sync_at: last_initial_sync_at.or(last_sync_at),
        }
    }

    pub fn processed_blocks(&self) -> &[ProcessedBlock] {
        &self.processed_blocks
    }

    /// The locally synced tip: the last processed block.
    pub fn tip(&self) -> Option<&ProcessedBlock> {
        self.processed_blocks.last()
    }

    pub fn tip_hash(&self) -> Option<&str> {
        self.tip().map(|b| b.hash.as_str())
    }

    pub fn tip_height(&self) -> Option<u64> {
        self.tip().map(|b| b.height)
    }

    pub fn last_sync_at(&self) -> Option<i64> {
        self.last_sync_at
    }

    pub fn last_initial_sync_at(&self) -> Option<i64> {
        self.last_initial_sync_at
    }

    /// True once the node has completed at least one sync.
    pub fn has_synced(&self) -> bool {
        self.last_sync_at.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_blocks.is_empty()
            && self.last_sync_at.is_none()
            && self.last_initial_sync_at.is_none()
    }

    /// Record a completed sync at `at`.
    ///
    /// The first call also stamps `last_initial_sync_at`; later calls never
    /// touch it.
    pub fn set_last_sync_at(&mut self, at: i64) {
        if self.last_initial_sync_at.is_none() {
            self.last_initial_sync_at = Some(at);
        }
        self.last_sync_at = Some(at);
    }

    /// Carry over an initial sync time recorded earlier.
    ///
    /// An existing `earlier` value always wins; with none, a checkpoint that
    /// has synced but lacks an initial sync time gets its sync time.
    pub fn keep_initial_sync_at(&mut self, earlier: Option<i64>) {
        self.last_initial_sync_at = earlier
            .or(self.last_initial_sync_at)
            .or(self.last_sync_at);
    }

    /// Append a block above the current tip.
    pub fn push_block(&mut self, block: ProcessedBlock) -> Result<()> {
        if let Some(tip) = self.tip() {
            if block.height <= tip.height {
                return Err(CoreError::BlockOutOfOrder {
                    tip: tip.height,
                    height: block.height,
                });
            }
        }
        self.processed_blocks.push(block);
        Ok(())
    }

    /// Drop every block above `height` and return them, lowest first.
    pub fn rollback_to(&mut self, height: u64) -> Vec<ProcessedBlock> {
        let keep = self
            .processed_blocks
            .iter()
            .position(|b| b.height > height)
            .unwrap_or(self.processed_blocks.len());
        self.processed_blocks.split_off(keep)
    }

    /// Keep at most `limit` of the most recent blocks.
    pub fn retain_last(&mut self, limit: usize) {
        if self.processed_blocks.len() > limit {
            let excess = self.processed_blocks.len() - limit;
            self.processed_blocks.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_checkpoint() {
        let cp = SyncCheckpoint::empty();
        assert!(cp.is_empty());
        assert!(cp.tip().is_none());
        assert!(!cp.has_synced());
        assert_eq!(cp.last_initial_sync_at(), None);
    }

    #[test]
    fn test_initial_sync_set_once() {
        let mut cp = SyncCheckpoint::empty();
        cp.set_last_sync_at(1_000);
        assert_eq!(cp.last_sync_at(), Some(1_000));
        assert_eq!(cp.last_initial_sync_at(), Some(1_000));

        cp.set_last_sync_at(2_000);
        cp.set_last_sync_at(3_000);
        assert_eq!(cp.last_sync_at(), Some(3_000));
        assert_eq!(cp.last_initial_sync_at(), Some(1_000));
    }

    #[test]
    fn test_from_parts_fills_initial_sync() {
        let cp = SyncCheckpoint::from_parts(vec![], Some(3_000), None);
        assert_eq!(cp.last_initial_sync_at(), Some(3_000));

        let cp = SyncCheckpoint::from_parts(vec![], None, None);
        assert!(cp.is_empty());
    }

    #[test]
    fn test_keep_initial_sync_at() {
        let mut cp = SyncCheckpoint::from_parts(vec![], Some(2_000), Some(2_000));
        cp.keep_initial_sync_at(Some(1_000));
        assert_eq!(cp.last_initial_sync_at(), Some(1_000));
        assert_eq!(cp.last_sync_at(), Some(2_000));

        cp.keep_initial_sync_at(None);
        assert_eq!(cp.last_initial_sync_at(), Some(1_000));
    }

    #[test]
    fn test_tip_is_last_block() {
        let mut cp = SyncCheckpoint::empty();
        cp.push_block(ProcessedBlock::new(1, "h1")).unwrap();
        cp.push_block(ProcessedBlock::new(2, "h2")).unwrap();
        assert_eq!(cp.tip_hash(), Some("h2"));
        assert_eq!(cp.tip_height(), Some(2));
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut cp = SyncCheckpoint::empty();
        cp.push_block(ProcessedBlock::new(5, "h5")).unwrap();
        let err = cp.push_block(ProcessedBlock::new(5, "other")).unwrap_err();
        assert_eq!(err, CoreError::BlockOutOfOrder { tip: 5, height: 5 });
    }

    #[test]
    fn test_rollback_returns_orphans() {
        let mut cp = SyncCheckpoint::empty();
        for h in 1..=5 {
            cp.push_block(ProcessedBlock::new(h, format!("h{}", h))).unwrap();
        }

        let orphans = cp.rollback_to(3);
        assert_eq!(
            orphans,
            vec![ProcessedBlock::new(4, "h4"), ProcessedBlock::new(5, "h5")]
        );
        assert_eq!(cp.tip_hash(), Some("h3"));

        assert!(cp.rollback_to(10).is_empty());
    }

    #[test]
    fn test_retain_last() {
        let mut cp = SyncCheckpoint::empty();
        for h in 1..=10 {
            cp.push_block(ProcessedBlock::new(h, format!("h{}", h))).unwrap();
        }
        cp.retain_last(3);
        let heights: Vec<u64> = cp.processed_blocks().iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![8, 9, 10]);
    }

    #[test]
    fn test_serde_field_names() {
        let mut cp = SyncCheckpoint::empty();
        cp.push_block(ProcessedBlock::new(1, "h1")).unwrap();
        cp.set_last_sync_at(42);

        let json = serde_json::to_value(&cp).unwrap();
        assert_eq!(json["processedBlocks"][0]["hash"], "h1");
        assert_eq!(json["lastSyncAt"], 42);
        assert_eq!(json["lastInitialSyncAt"], 42);

        let back: SyncCheckpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, cp);
    }
}
