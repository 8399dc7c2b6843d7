//! Sync status: a read model over one checkpoint and one chain snapshot.

use std::fmt;

use drive_sync_core::SyncCheckpoint;
use drive_sync_store::CheckpointSource;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::ledger::Ledger;
use crate::observer::{ChainObserver, ChainSnapshot};

/// Where local processing stands relative to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    /// No sync has ever completed.
    InitialSync,
    /// Behind the chain, or the ledger itself is still catching up.
    Syncing,
    Synced,
}

impl SyncStatus {
    /// Derive the status.
    ///
    /// `InitialSync` wins over everything; `Syncing` covers both an
    /// unsynced ledger and a tip mismatch.
    pub fn derive(checkpoint: &SyncCheckpoint, snapshot: &ChainSnapshot) -> Self {
        if !checkpoint.has_synced() {
            SyncStatus::InitialSync
        } else if !snapshot.is_fully_synced || checkpoint.tip_hash() != snapshot.hash.as_deref() {
            SyncStatus::Syncing
        } else {
            SyncStatus::Synced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InitialSync => "initialSync",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time sync information.
///
/// Built from a single checkpoint and a single snapshot, so every field of
/// one response describes the same moment. Serializes to the flat record
/// exposed by the status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    pub last_synced_block_height: Option<u64>,
    pub last_synced_block_hash: Option<String>,
    pub last_sync_at: Option<i64>,
    pub last_initial_sync_at: Option<i64>,
    pub last_chain_block_height: u64,
    pub last_chain_block_hash: Option<String>,
    #[serde(skip)]
    pub is_chain_fully_synced: bool,
    status: SyncStatus,
}

impl SyncInfo {
    pub fn new(checkpoint: &SyncCheckpoint, snapshot: &ChainSnapshot) -> Self {
        Self {
            last_synced_block_height: checkpoint.tip_height(),
            last_synced_block_hash: checkpoint.tip_hash().map(str::to_owned),
            last_sync_at: checkpoint.last_sync_at(),
            last_initial_sync_at: checkpoint.last_initial_sync_at(),
            last_chain_block_height: snapshot.height,
            last_chain_block_hash: snapshot.hash.clone(),
            is_chain_fully_synced: snapshot.is_fully_synced,
            status: SyncStatus::derive(checkpoint, snapshot),
        }
    }

    /// Load the checkpoint and take a snapshot, concurrently, for one
    /// response.
    pub async fn query<S, L>(source: &S, observer: &ChainObserver<L>) -> Result<Self>
    where
        S: CheckpointSource + ?Sized,
        L: Ledger,
    {
        let (checkpoint, snapshot) = tokio::try_join!(
            async { source.load().await.map_err(SyncError::from) },
            async { observer.snapshot().await.map_err(SyncError::from) },
        )?;
        Ok(Self::new(&checkpoint, &snapshot))
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }
}
