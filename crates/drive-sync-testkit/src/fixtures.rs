//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a Drive wired to in-memory
//! collaborators that stay reachable for scripting.

use std::sync::Arc;

use rand::Rng;

use drive_sync::{Drive, DriveConfig};
use drive_sync_chain::ledger::memory::MemoryLedger;
use drive_sync_chain::ChainTip;
use drive_sync_core::{Packet, ProcessedBlock, Value};
use drive_sync_store::{MemoryCollection, MemoryContentStore};

/// A Drive over in-memory collaborators.
pub type MemoryDrive = Drive<Arc<MemoryContentStore>, Arc<MemoryCollection>, Arc<MemoryLedger>>;

/// A test fixture with a Drive and handles on its collaborators.
pub struct TestFixture {
    pub content: Arc<MemoryContentStore>,
    pub collection: Arc<MemoryCollection>,
    pub ledger: Arc<MemoryLedger>,
    pub drive: Arc<MemoryDrive>,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DriveConfig::default())
    }

    pub fn with_config(config: DriveConfig) -> Self {
        let content = Arc::new(MemoryContentStore::new());
        let collection = Arc::new(MemoryCollection::new());
        let ledger = Arc::new(MemoryLedger::new());
        let drive = Arc::new(Drive::new(
            content.clone(),
            collection.clone(),
            ledger.clone(),
            config,
        ));
        Self {
            content,
            collection,
            ledger,
            drive,
        }
    }

    /// Point the ledger at `block` and mark it fully synced.
    pub fn set_chain_tip(&self, block: &ProcessedBlock) {
        self.ledger
            .set_tip(ChainTip::new(block.height, block.hash.clone()));
        self.ledger.set_fully_synced(true);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A random 32-byte block hash in hex.
pub fn random_block_hash() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// `count` consecutive blocks starting at `start`, with random hashes.
pub fn block_chain(start: u64, count: usize) -> Vec<ProcessedBlock> {
    (0..count as u64)
        .map(|i| ProcessedBlock::new(start + i, random_block_hash()))
        .collect()
}

/// A small packet whose identity depends on `n`.
pub fn sample_packet(n: u64) -> Packet {
    Packet::new(1, "dashpay", format!("{:064x}", n)).with_objects(vec![Value::Map(vec![
        (Value::Text("type".into()), Value::Text("contact".into())),
        (Value::Text("seq".into()), Value::Integer(n.into())),
    ])])
}

/// A packet with `objects` random integers.
pub fn random_packet(objects: usize) -> Packet {
    let mut rng = rand::thread_rng();
    let values = (0..objects)
        .map(|_| Value::Integer(rng.gen::<i64>().into()))
        .collect();
    Packet::new(1, "bench", random_block_hash()).with_objects(values)
}
