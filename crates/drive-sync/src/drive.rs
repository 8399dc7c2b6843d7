//! The Drive: unified API over packet storage and sync tracking.
//!
//! The Drive wires the collaborators (content store, document collection,
//! ledger) into the packet store, the checkpoint repository, the chain
//! observer and the sync coordinator, and exposes the status surface.

use std::sync::Arc;

use drive_sync_chain::{
    ChainObserver, ChainSnapshot, ChangeWatcher, Ledger, SyncCoordinator, SyncInfo,
};
use drive_sync_core::{ContentId, Packet, SyncCheckpoint};
use drive_sync_store::{
    CheckpointReader, CheckpointRepository, CheckpointWriter, ContentStore, DocumentCollection,
    PacketStore,
};
use tracing::debug;

use crate::config::DriveConfig;
use crate::error::{DriveError, Result};

type Watcher<D> = ChangeWatcher<CheckpointReader<D>>;

/// The main Drive struct.
///
/// Provides:
/// - Packet store/retrieve/pin/unpin by content identifier
/// - The single checkpoint writer for the block-processing pipeline
/// - Sync status queries and a "not ready" gate
/// - Waiting for sync
pub struct Drive<C, D, L>
where
    C: ContentStore,
    D: DocumentCollection + 'static,
    L: Ledger,
{
    packets: PacketStore<C>,
    checkpoints: Arc<CheckpointRepository<D>>,
    coordinator: SyncCoordinator<CheckpointReader<D>, Arc<L>>,
    config: DriveConfig,
}

impl<C, D, L> Drive<C, D, L>
where
    C: ContentStore,
    D: DocumentCollection + 'static,
    L: Ledger,
{
    /// Create a new Drive over the given collaborators.
    pub fn new(content: C, collection: D, ledger: L, config: DriveConfig) -> Self {
        let checkpoints = Arc::new(CheckpointRepository::new(collection));
        let reader = Arc::new(CheckpointReader::new(checkpoints.clone()));
        let watcher = Arc::new(ChangeWatcher::new(reader, config.watcher()));
        let coordinator = SyncCoordinator::new(ChainObserver::new(Arc::new(ledger)), watcher);

        Self {
            packets: PacketStore::new(content, config.packet_store()),
            checkpoints,
            coordinator,
            config,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn packets(&self) -> &PacketStore<C> {
        &self.packets
    }

    pub fn watcher(&self) -> &Arc<Watcher<D>> {
        self.coordinator.watcher()
    }

    pub fn observer(&self) -> &ChainObserver<Arc<L>> {
        self.coordinator.observer()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Packets
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a packet and return its identifier.
    pub async fn store_packet(&self, packet: &Packet) -> Result<ContentId> {
        Ok(self.packets.store(packet).await?)
    }

    /// Store and pin a packet.
    pub async fn store_and_pin(&self, packet: &Packet) -> Result<ContentId> {
        let id = self.packets.store(packet).await?;
        self.packets.pin(&id).await?;
        Ok(id)
    }

    /// Retrieve a packet by the hex encoding of its hash.
    ///
    /// A malformed hash is an input error; the content store is never
    /// asked.
    pub async fn retrieve_by_hash(&self, hash_hex: &str) -> Result<Packet> {
        let id = ContentId::from_hash_hex(hash_hex)?;
        Ok(self.packets.retrieve(&id).await?)
    }

    /// Release the packets of orphaned blocks.
    ///
    /// Packets that were never pinned are skipped. Returns how many pins
    /// were removed.
    pub async fn release_packets(&self, ids: &[ContentId]) -> Result<usize> {
        let mut released = 0;
        for id in ids {
            if self.packets.unpin_if_pinned(id).await? {
                released += 1;
            }
        }
        debug!(requested = ids.len(), released, "released packets");
        Ok(released)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkpoint
    // ─────────────────────────────────────────────────────────────────────────

    /// Claim the single checkpoint writer.
    pub async fn checkpoint_writer(&self) -> Result<CheckpointWriter<D>> {
        Ok(CheckpointWriter::open(self.checkpoints.clone(), self.config.checkpoint_writer()).await?)
    }

    pub fn checkpoint_reader(&self) -> CheckpointReader<D> {
        CheckpointReader::new(self.checkpoints.clone())
    }

    pub async fn checkpoint(&self) -> Result<SyncCheckpoint> {
        Ok(self.checkpoints.load().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn chain_snapshot(&self) -> Result<ChainSnapshot> {
        Ok(self.observer().snapshot().await?)
    }

    /// Sync info from one fresh checkpoint and one fresh snapshot.
    pub async fn sync_info(&self) -> Result<SyncInfo> {
        Ok(SyncInfo::query(self.checkpoints.as_ref(), self.observer()).await?)
    }

    /// The flat status record exposed to callers.
    pub async fn status_record(&self) -> Result<serde_json::Value> {
        let info = self.sync_info().await?;
        Ok(serde_json::to_value(&info)?)
    }

    /// Fail with [`DriveError::NotReady`] unless the Drive is synced.
    pub async fn ensure_ready(&self) -> Result<SyncInfo> {
        let info = self.sync_info().await?;
        if !info.status().is_synced() {
            return Err(DriveError::NotReady {
                status: info.status(),
            });
        }
        Ok(info)
    }

    /// Wait until the local tip reaches the chain tip, bounded by the
    /// configured deadline if there is one.
    pub async fn await_sync(&self) -> Result<SyncCheckpoint> {
        let checkpoint = match self.config.sync_deadline {
            Some(deadline) => self.coordinator.await_sync_within(deadline).await?,
            None => self.coordinator.await_sync().await?,
        };
        Ok(checkpoint)
    }
}
