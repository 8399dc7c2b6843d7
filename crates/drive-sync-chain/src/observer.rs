//! Chain observer: one fresh snapshot of the ledger per call.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{ChainTip, Ledger};

/// The ledger's tip together with its fully-synced flag.
///
/// Never cached: every status decision takes a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub height: u64,
    pub hash: Option<String>,
    pub is_fully_synced: bool,
}

impl ChainSnapshot {
    pub fn new(tip: ChainTip, is_fully_synced: bool) -> Self {
        Self {
            height: tip.height,
            hash: tip.hash,
            is_fully_synced,
        }
    }
}

/// Combines the two ledger queries into a [`ChainSnapshot`].
#[derive(Debug, Clone)]
pub struct ChainObserver<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> ChainObserver<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Query tip and sync flag concurrently.
    ///
    /// Either failure is returned unchanged; nothing is retried.
    pub async fn snapshot(&self) -> Result<ChainSnapshot, LedgerError> {
        let (tip, is_fully_synced) =
            tokio::try_join!(self.ledger.get_tip(), self.ledger.is_chain_fully_synced())?;
        Ok(ChainSnapshot::new(tip, is_fully_synced))
    }
}
