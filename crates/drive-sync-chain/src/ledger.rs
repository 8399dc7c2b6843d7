//! Ledger abstraction: the chain tip and the node's own sync flag.
//!
//! The ledger client is an external collaborator. This module defines the
//! interface the sync core consumes, plus an in-memory implementation for
//! testing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// The ledger's current best block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub height: u64,
    /// `None` only for an empty chain.
    pub hash: Option<String>,
}

impl ChainTip {
    pub fn new(height: u64, hash: impl Into<String>) -> Self {
        Self {
            height,
            hash: Some(hash.into()),
        }
    }

    /// The tip of a chain with no blocks.
    pub fn empty() -> Self {
        Self {
            height: 0,
            hash: None,
        }
    }
}

/// Read access to the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current best block height and hash.
    async fn get_tip(&self) -> Result<ChainTip, LedgerError>;

    /// Whether the ledger node itself reports being fully synced.
    async fn is_chain_fully_synced(&self) -> Result<bool, LedgerError>;
}

#[async_trait]
impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    async fn get_tip(&self) -> Result<ChainTip, LedgerError> {
        (**self).get_tip().await
    }

    async fn is_chain_fully_synced(&self) -> Result<bool, LedgerError> {
        (**self).is_chain_fully_synced().await
    }
}

/// In-memory ledger for testing.
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// A scriptable ledger.
    ///
    /// Starts as an empty, not-yet-synced chain.
    pub struct MemoryLedger {
        tip: RwLock<ChainTip>,
        fully_synced: AtomicBool,
        unavailable: AtomicBool,
        queries: AtomicUsize,
    }

    impl MemoryLedger {
        pub fn new() -> Self {
            Self {
                tip: RwLock::new(ChainTip::empty()),
                fully_synced: AtomicBool::new(false),
                unavailable: AtomicBool::new(false),
                queries: AtomicUsize::new(0),
            }
        }

        /// A ledger already at `tip`.
        pub fn with_tip(tip: ChainTip, fully_synced: bool) -> Self {
            let ledger = Self::new();
            ledger.set_tip(tip);
            ledger.set_fully_synced(fully_synced);
            ledger
        }

        pub fn set_tip(&self, tip: ChainTip) {
            if let Ok(mut guard) = self.tip.write() {
                *guard = tip;
            }
        }

        pub fn set_fully_synced(&self, fully_synced: bool) {
            self.fully_synced.store(fully_synced, Ordering::SeqCst);
        }

        /// Make every query fail.
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Number of `get_tip` calls served.
        pub fn tip_queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }

        fn check_available(&self) -> Result<(), LedgerError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("memory ledger offline".into()));
            }
            Ok(())
        }
    }

    impl Default for MemoryLedger {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Ledger for MemoryLedger {
        async fn get_tip(&self) -> Result<ChainTip, LedgerError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.check_available()?;
            self.tip
                .read()
                .map(|tip| tip.clone())
                .map_err(|_| LedgerError::Rpc("tip lock poisoned".into()))
        }

        async fn is_chain_fully_synced(&self) -> Result<bool, LedgerError> {
            self.check_available()?;
            Ok(self.fully_synced.load(Ordering::SeqCst))
        }
    }
}
