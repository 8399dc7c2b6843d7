//! Sync coordinator: wait until local processing has caught up with the
//! chain tip.

use std::sync::Arc;
use std::time::Duration;

use drive_sync_core::SyncCheckpoint;
use drive_sync_store::CheckpointSource;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::ledger::Ledger;
use crate::observer::{ChainObserver, ChainSnapshot};
use crate::watcher::{ChangeWatcher, WatchEvent};

fn tips_match(checkpoint: &SyncCheckpoint, snapshot: &ChainSnapshot) -> bool {
    checkpoint.tip_hash() == snapshot.hash.as_deref()
}

/// Combines the checkpoint, the chain observer and the change watcher.
pub struct SyncCoordinator<S: CheckpointSource + 'static, L: Ledger> {
    source: Arc<S>,
    observer: ChainObserver<L>,
    watcher: Arc<ChangeWatcher<S>>,
}

impl<S: CheckpointSource + 'static, L: Ledger> SyncCoordinator<S, L> {
    /// The watcher must poll the same source the coordinator loads from.
    pub fn new(observer: ChainObserver<L>, watcher: Arc<ChangeWatcher<S>>) -> Self {
        Self {
            source: watcher.source().clone(),
            observer,
            watcher,
        }
    }

    pub fn watcher(&self) -> &Arc<ChangeWatcher<S>> {
        &self.watcher
    }

    pub fn observer(&self) -> &ChainObserver<L> {
        &self.observer
    }

    /// Resolve once the local tip equals the chain tip.
    ///
    /// Returns at once, without starting the watcher, when the tips
    /// already match (including an empty chain with no processed blocks).
    /// Otherwise every change that carries a completed sync is checked
    /// against a freshly queried chain tip. A watcher error rejects the
    /// wait and leaves the watcher running.
    pub async fn await_sync(&self) -> Result<SyncCheckpoint> {
        let checkpoint = self.source.load().await?;
        let snapshot = self.observer.snapshot().await?;
        if tips_match(&checkpoint, &snapshot) {
            debug!(tip = ?checkpoint.tip_hash(), "already synced to chain tip");
            return Ok(checkpoint);
        }

        debug!(
            local = ?checkpoint.tip_hash(),
            chain = ?snapshot.hash,
            "waiting for sync"
        );
        let mut events = self.watcher.subscribe();
        self.watcher.listen().await?;

        // A write between the first load and the watcher's baseline would
        // never surface as a change.
        let checkpoint = self.source.load().await?;
        if checkpoint.has_synced() && tips_match(&checkpoint, &self.observer.snapshot().await?) {
            self.watcher.stop();
            return Ok(checkpoint);
        }

        loop {
            match events.recv().await {
                Ok(WatchEvent::Change(checkpoint)) => {
                    if !checkpoint.has_synced() {
                        continue;
                    }
                    let snapshot = self.observer.snapshot().await?;
                    if tips_match(&checkpoint, &snapshot) {
                        self.watcher.stop();
                        info!(tip = ?checkpoint.tip_hash(), "synced to chain tip");
                        return Ok(checkpoint);
                    }
                }
                Ok(WatchEvent::Error(e)) => return Err(SyncError::Watch(e)),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "sync waiter lagged behind checkpoint changes");
                }
                Err(RecvError::Closed) => return Err(SyncError::WatcherClosed),
            }
        }
    }

    /// [`await_sync`](Self::await_sync) bounded by `deadline`.
    ///
    /// On expiry the watcher keeps running for other waiters.
    pub async fn await_sync_within(&self, deadline: Duration) -> Result<SyncCheckpoint> {
        match tokio::time::timeout(deadline, self.await_sync()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "sync deadline expired");
                Err(SyncError::Deadline(deadline))
            }
        }
    }
}
