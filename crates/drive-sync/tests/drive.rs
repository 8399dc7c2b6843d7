//! End-to-end behaviour of the Drive facade.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use drive_sync::chain::ledger::memory::MemoryLedger;
use drive_sync::chain::{ChainTip, SyncError};
use drive_sync::core::{Packet, ProcessedBlock, Value};
use drive_sync::store::{MemoryCollection, MemoryContentStore, SqliteCollection, CHECKPOINT_COLLECTION};
use drive_sync::{Drive, DriveConfig, DriveError, SyncStatus};
use serde_json::json;
use tempfile::TempDir;

type MemoryDrive = Drive<Arc<MemoryContentStore>, Arc<MemoryCollection>, Arc<MemoryLedger>>;

struct Harness {
    content: Arc<MemoryContentStore>,
    ledger: Arc<MemoryLedger>,
    drive: Arc<MemoryDrive>,
}

fn harness(config: DriveConfig) -> Harness {
    let _ = drive_sync::telemetry::init_tracing();
    let content = Arc::new(MemoryContentStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let drive = Arc::new(Drive::new(
        content.clone(),
        Arc::new(MemoryCollection::new()),
        ledger.clone(),
        config,
    ));
    Harness {
        content,
        ledger,
        drive,
    }
}

fn packet(n: i64) -> Packet {
    Packet::new(1, "dashpay", format!("root-{}", n)).with_objects(vec![Value::Integer(n.into())])
}

#[tokio::test]
async fn not_ready_until_synced() -> Result<()> {
    let h = harness(DriveConfig::default());
    h.ledger.set_tip(ChainTip::new(2, "h2"));

    let err = h.drive.ensure_ready().await.unwrap_err();
    assert!(matches!(
        err,
        DriveError::NotReady {
            status: SyncStatus::InitialSync
        }
    ));
    assert_eq!(err.code(), "NOT_READY");

    let mut writer = h.drive.checkpoint_writer().await?;
    writer.apply_block(ProcessedBlock::new(2, "h2")).await?;
    writer.mark_synced(1_700_000_000_000).await?;

    let err = h.drive.ensure_ready().await.unwrap_err();
    assert!(matches!(
        err,
        DriveError::NotReady {
            status: SyncStatus::Syncing
        }
    ));

    h.ledger.set_fully_synced(true);
    let info = h.drive.ensure_ready().await?;
    assert_eq!(info.status(), SyncStatus::Synced);
    Ok(())
}

#[tokio::test]
async fn status_record_is_flat() -> Result<()> {
    let h = harness(DriveConfig::default());
    h.ledger.set_tip(ChainTip::new(9, "h9"));
    h.ledger.set_fully_synced(true);

    let mut writer = h.drive.checkpoint_writer().await?;
    writer.apply_block(ProcessedBlock::new(8, "h8")).await?;
    writer.mark_synced(100).await?;

    assert_eq!(
        h.drive.status_record().await?,
        json!({
            "lastSyncedBlockHeight": 8,
            "lastSyncedBlockHash": "h8",
            "lastSyncAt": 100,
            "lastInitialSyncAt": 100,
            "lastChainBlockHeight": 9,
            "lastChainBlockHash": "h9",
            "status": "syncing",
        })
    );
    Ok(())
}

#[tokio::test]
async fn second_writer_refused() -> Result<()> {
    let h = harness(DriveConfig::default());
    let _writer = h.drive.checkpoint_writer().await?;

    let err = h.drive.checkpoint_writer().await.err().expect("second writer");
    assert_eq!(err.code(), "INTERNAL");
    Ok(())
}

#[tokio::test]
async fn invalid_hash_is_input_error() -> Result<()> {
    let h = harness(DriveConfig::default());
    let err = h.drive.retrieve_by_hash("not-a-hash").await.unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    Ok(())
}

#[tokio::test]
async fn packets_round_trip_by_hash() -> Result<()> {
    let h = harness(DriveConfig::default());
    let original = packet(1).with_meta(Value::Text("peer".into()));

    let id = h.drive.store_and_pin(&original).await?;
    assert!(h.content.is_pinned(&id));

    let fetched = h.drive.retrieve_by_hash(&id.hash().to_hex()).await?;
    assert_eq!(fetched.object_set_hash, "root-1");
    assert!(fetched.meta.is_none());
    Ok(())
}

#[tokio::test]
async fn release_packets_skips_unpinned() -> Result<()> {
    let h = harness(DriveConfig::default());
    let pinned = h.drive.store_and_pin(&packet(1)).await?;
    let unpinned = h.drive.store_packet(&packet(2)).await?;

    assert_eq!(h.drive.release_packets(&[pinned, unpinned]).await?, 1);
    assert!(h.drive.packets().pinned().await?.is_empty());

    // re-pinning content that reappears on the new chain
    h.drive.packets().pin(&pinned).await?;
    assert_eq!(h.drive.packets().pinned().await?, vec![pinned]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn retrieve_timeout_is_retryable() -> Result<()> {
    let h = harness(DriveConfig {
        packet_timeout: Duration::from_millis(200),
        ..DriveConfig::default()
    });
    let id = h.drive.store_packet(&packet(1)).await?;

    h.content.set_latency(Some(Duration::from_secs(5)));
    let err = h.drive.retrieve_by_hash(&id.hash().to_hex()).await.unwrap_err();
    assert_eq!(err.code(), "TIMEOUT");

    h.content.set_latency(None);
    assert!(h.drive.retrieve_by_hash(&id.hash().to_hex()).await.is_ok());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn await_sync_resolves_after_pipeline_catches_up() -> Result<()> {
    let h = harness(DriveConfig {
        watch_interval: Duration::from_secs(1),
        ..DriveConfig::default()
    });
    h.ledger.set_tip(ChainTip::new(2, "h2"));
    h.ledger.set_fully_synced(true);

    let drive = h.drive.clone();
    let wait = tokio::spawn(async move { drive.await_sync().await });
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(h.drive.watcher().is_listening());

    let mut writer = h.drive.checkpoint_writer().await?;
    writer.apply_block(ProcessedBlock::new(1, "h1")).await?;
    writer.apply_block(ProcessedBlock::new(2, "h2")).await?;
    writer.mark_synced(42).await?;

    let checkpoint = wait.await??;
    assert_eq!(checkpoint.tip_hash(), Some("h2"));
    assert!(!h.drive.watcher().is_listening());
    assert_eq!(h.drive.sync_info().await?.status(), SyncStatus::Synced);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn await_sync_honours_deadline() -> Result<()> {
    let h = harness(DriveConfig {
        watch_interval: Duration::from_secs(1),
        sync_deadline: Some(Duration::from_secs(10)),
        ..DriveConfig::default()
    });
    h.ledger.set_tip(ChainTip::new(2, "h2"));

    let err = h.drive.await_sync().await.unwrap_err();
    assert!(matches!(err, DriveError::Sync(SyncError::Deadline(_))));
    assert_eq!(err.code(), "TIMEOUT");
    Ok(())
}

#[tokio::test]
async fn checkpoint_survives_restart_on_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("drive.db");

    {
        let drive = Drive::new(
            MemoryContentStore::new(),
            SqliteCollection::open(&path, CHECKPOINT_COLLECTION)?,
            MemoryLedger::new(),
            DriveConfig::default(),
        );
        let mut writer = drive.checkpoint_writer().await?;
        writer.apply_block(ProcessedBlock::new(1, "h1")).await?;
        writer.mark_synced(10).await?;
        writer.mark_synced(20).await?;
    }

    let drive = Drive::new(
        MemoryContentStore::new(),
        SqliteCollection::open(&path, CHECKPOINT_COLLECTION)?,
        MemoryLedger::with_tip(ChainTip::new(1, "h1"), true),
        DriveConfig::default(),
    );
    let checkpoint = drive.checkpoint().await?;
    assert_eq!(checkpoint.last_initial_sync_at(), Some(10));
    assert_eq!(checkpoint.last_sync_at(), Some(20));
    assert_eq!(drive.ensure_ready().await?.status(), SyncStatus::Synced);
    Ok(())
}

#[tokio::test]
async fn watcher_source_reads_what_the_writer_wrote() -> Result<()> {
    use drive_sync::store::{CheckpointReader, CheckpointSource};

    let h = harness(DriveConfig::default());
    let mut writer = h.drive.checkpoint_writer().await?;
    writer.mark_synced(1_000).await?;

    let source: &Arc<CheckpointReader<Arc<MemoryCollection>>> = h.drive.watcher().source();
    let seen = source.load().await?;
    assert_eq!(seen.last_initial_sync_at(), Some(1_000));
    assert_eq!(&seen, writer.checkpoint());
    Ok(())
}
