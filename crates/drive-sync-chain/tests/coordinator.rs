//! Sync coordinator behaviour against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use drive_sync_chain::ledger::memory::MemoryLedger;
use drive_sync_chain::{
    ChainObserver, ChainTip, ChangeWatcher, SyncCoordinator, SyncError, SyncInfo, SyncStatus,
    WatcherConfig,
};
use drive_sync_core::ProcessedBlock;
use drive_sync_store::{CheckpointRepository, CheckpointWriter, MemoryCollection};

const PERIOD: Duration = Duration::from_secs(5);

type Repo = CheckpointRepository<Arc<MemoryCollection>>;

struct Harness {
    collection: Arc<MemoryCollection>,
    repo: Arc<Repo>,
    ledger: Arc<MemoryLedger>,
    coordinator: Arc<SyncCoordinator<Repo, Arc<MemoryLedger>>>,
}

impl Harness {
    fn new(ledger: MemoryLedger) -> Self {
        let collection = Arc::new(MemoryCollection::new());
        let repo = Arc::new(CheckpointRepository::new(collection.clone()));
        let ledger = Arc::new(ledger);
        let watcher = Arc::new(ChangeWatcher::new(
            repo.clone(),
            WatcherConfig {
                watch_interval: PERIOD,
            },
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            ChainObserver::new(ledger.clone()),
            watcher,
        ));
        Self {
            collection,
            repo,
            ledger,
            coordinator,
        }
    }

    async fn writer(&self) -> CheckpointWriter<Arc<MemoryCollection>> {
        CheckpointWriter::open(self.repo.clone(), Default::default())
            .await
            .unwrap()
    }

    fn is_listening(&self) -> bool {
        self.coordinator.watcher().is_listening()
    }
}

#[tokio::test]
async fn returns_immediately_on_empty_chain() {
    let h = Harness::new(MemoryLedger::new());

    let checkpoint = h.coordinator.await_sync().await.unwrap();
    assert!(checkpoint.is_empty());
    assert!(!h.is_listening());
}

#[tokio::test]
async fn returns_immediately_when_tips_match() {
    let h = Harness::new(MemoryLedger::with_tip(ChainTip::new(5, "h5"), true));
    let mut writer = h.writer().await;
    writer.apply_block(ProcessedBlock::new(5, "h5")).await.unwrap();
    writer.mark_synced(100).await.unwrap();

    let checkpoint = h.coordinator.await_sync().await.unwrap();
    assert_eq!(checkpoint.tip_hash(), Some("h5"));
    assert!(!h.is_listening());
}

#[tokio::test(start_paused = true)]
async fn waits_for_real_progress() {
    let h = Harness::new(MemoryLedger::with_tip(ChainTip::new(3, "h3"), true));
    let mut writer = h.writer().await;

    let coordinator = h.coordinator.clone();
    let wait = tokio::spawn(async move { coordinator.await_sync().await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.is_listening());

    // matching tip but no completed sync yet
    writer.apply_block(ProcessedBlock::new(3, "h3")).await.unwrap();
    tokio::time::sleep(PERIOD * 2).await;
    assert!(!wait.is_finished());

    // completed sync, but the chain has moved on
    h.ledger.set_tip(ChainTip::new(4, "h4"));
    writer.mark_synced(1_000).await.unwrap();
    tokio::time::sleep(PERIOD * 2).await;
    assert!(!wait.is_finished());

    writer.apply_block(ProcessedBlock::new(4, "h4")).await.unwrap();
    let checkpoint = wait.await.unwrap().unwrap();
    assert_eq!(checkpoint.tip_hash(), Some("h4"));
    assert_eq!(checkpoint.last_initial_sync_at(), Some(1_000));
    assert!(!h.is_listening());
}

#[tokio::test(start_paused = true)]
async fn watcher_error_rejects_wait() {
    let h = Harness::new(MemoryLedger::with_tip(ChainTip::new(3, "h3"), true));

    let coordinator = h.coordinator.clone();
    let wait = tokio::spawn(async move { coordinator.await_sync().await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    h.collection.set_unavailable(true);
    let err = wait.await.unwrap().unwrap_err();
    assert!(matches!(err, SyncError::Watch(_)));
    assert!(h.is_listening());
}

#[tokio::test(start_paused = true)]
async fn deadline_expires_without_progress() {
    let h = Harness::new(MemoryLedger::with_tip(ChainTip::new(3, "h3"), true));

    let err = h
        .coordinator
        .await_sync_within(PERIOD * 3)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Deadline(d) if d == PERIOD * 3));
    assert!(h.is_listening());
}

#[tokio::test]
async fn ledger_failure_propagates() {
    let h = Harness::new(MemoryLedger::new());
    h.ledger.set_unavailable(true);

    assert!(matches!(
        h.coordinator.await_sync().await,
        Err(SyncError::Ledger(_))
    ));
    assert!(!h.is_listening());
}

#[tokio::test]
async fn status_follows_checkpoint() {
    let h = Harness::new(MemoryLedger::with_tip(ChainTip::new(2, "h2"), false));
    let observer = h.coordinator.observer();

    let info = SyncInfo::query(h.repo.as_ref(), observer).await.unwrap();
    assert_eq!(info.status(), SyncStatus::InitialSync);

    let mut writer = h.writer().await;
    writer.apply_block(ProcessedBlock::new(2, "h2")).await.unwrap();
    writer.mark_synced(50).await.unwrap();
    let info = SyncInfo::query(h.repo.as_ref(), observer).await.unwrap();
    assert_eq!(info.status(), SyncStatus::Syncing);

    h.ledger.set_fully_synced(true);
    let info = SyncInfo::query(h.repo.as_ref(), observer).await.unwrap();
    assert_eq!(info.status(), SyncStatus::Synced);
    assert_eq!(info.last_chain_block_hash.as_deref(), Some("h2"));
}
