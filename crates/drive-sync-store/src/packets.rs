//! Packet store: content-addressed persistence and pinning of packets.
//!
//! Every operation is keyed by the packet's [`ContentId`]. Retrieves and
//! pins are bounded by [`PacketStoreConfig::timeout`]; a timeout is its own
//! error kind and the operation is safe to retry.

use std::time::Duration;

use bytes::Bytes;
use drive_sync_core::{ContentId, Packet, PacketHash};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::traits::{ContentStore, PinKind};

/// Default deadline for retrieve and pin.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Packet store configuration.
#[derive(Debug, Clone)]
pub struct PacketStoreConfig {
    /// Deadline for retrieve and pin.
    pub timeout: Duration,
}

impl Default for PacketStoreConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Stores, fetches, pins and unpins packets in a [`ContentStore`].
pub struct PacketStore<C: ContentStore> {
    content: C,
    config: PacketStoreConfig,
}

impl<C: ContentStore> PacketStore<C> {
    pub fn new(content: C, config: PacketStoreConfig) -> Self {
        Self { content, config }
    }

    pub fn content_store(&self) -> &C {
        &self.content
    }

    pub fn config(&self) -> &PacketStoreConfig {
        &self.config
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout.as_millis() as u64
    }

    /// Write a packet and return its identifier.
    ///
    /// Metadata is stripped before writing. Storing the same packet again
    /// returns the same identifier and leaves one copy in the store.
    pub async fn store(&self, packet: &Packet) -> Result<ContentId> {
        let bytes = packet.to_bytes()?;
        let id = ContentId::from_hash(PacketHash::double_sha256(&bytes));

        let written = self.content.put(&id, Bytes::from(bytes)).await?;
        if written != id {
            return Err(StoreError::InvalidData(format!(
                "content store wrote {} for packet {}",
                written, id
            )));
        }

        debug!(%id, "stored packet");
        Ok(id)
    }

    /// Fetch and decode the packet stored under `id`.
    ///
    /// The fetched bytes must hash back to `id`. The returned packet never
    /// carries metadata.
    pub async fn retrieve(&self, id: &ContentId) -> Result<Packet> {
        let bytes = match timeout(self.config.timeout, self.content.get(id, self.config.timeout)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(%id, timeout_ms = self.timeout_ms(), "packet retrieve timed out");
                return Err(StoreError::RetrieveTimeout {
                    address: id.to_string(),
                    timeout_ms: self.timeout_ms(),
                });
            }
        };

        let actual = PacketHash::double_sha256(&bytes);
        if actual != *id.hash() {
            return Err(StoreError::InvalidData(format!(
                "bytes under {} hash to {}",
                id, actual
            )));
        }

        Ok(Packet::decode(&bytes)?)
    }

    /// Pin a stored packet, recursively.
    pub async fn pin(&self, id: &ContentId) -> Result<()> {
        match timeout(self.config.timeout, self.content.pin_add(id, true)).await {
            Ok(result) => {
                result?;
                debug!(%id, "pinned packet");
                Ok(())
            }
            Err(_) => {
                warn!(%id, timeout_ms = self.timeout_ms(), "packet pin timed out");
                Err(StoreError::PinTimeout {
                    address: id.to_string(),
                    timeout_ms: self.timeout_ms(),
                })
            }
        }
    }

    /// Remove the recursive pin on `id`.
    ///
    /// Fails with [`StoreError::NotPinned`] when there is nothing to unpin.
    pub async fn unpin(&self, id: &ContentId) -> Result<()> {
        self.content.pin_remove(id, true).await?;
        debug!(%id, "unpinned packet");
        Ok(())
    }

    /// Unpin, treating "not pinned" as success.
    ///
    /// Returns whether a pin was actually removed.
    pub async fn unpin_if_pinned(&self, id: &ContentId) -> Result<bool> {
        match self.unpin(id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_pinned() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every address holding a recursive pin.
    pub async fn pinned(&self) -> Result<Vec<ContentId>> {
        let entries = self.content.pin_list().await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.kind == PinKind::Recursive)
            .map(|e| e.address)
            .collect())
    }

    /// Remove every recursive pin and return how many were removed.
    ///
    /// The first real failure aborts the sweep; pins that vanish between
    /// listing and removal are skipped.
    pub async fn unpin_all(&self) -> Result<usize> {
        let mut removed = 0;
        for id in self.pinned().await? {
            if self.unpin_if_pinned(&id).await? {
                removed += 1;
            }
        }
        debug!(removed, "unpinned all packets");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryContentStore;
    use drive_sync_core::Value;
    use std::sync::Arc;

    fn packet(n: u32) -> Packet {
        Packet::new(1, format!("app-{}", n), "root").with_objects(vec![Value::Integer(n.into())])
    }

    fn store() -> (Arc<MemoryContentStore>, PacketStore<Arc<MemoryContentStore>>) {
        let content = Arc::new(MemoryContentStore::new());
        let store = PacketStore::new(content.clone(), PacketStoreConfig::default());
        (content, store)
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let (_, store) = store();
        let original = packet(1).with_meta(Value::Text("relay".into()));

        let id = store.store(&original).await.unwrap();
        assert_eq!(id, original.content_id().unwrap());

        let fetched = store.retrieve(&id).await.unwrap();
        assert_eq!(fetched.app_id, original.app_id);
        assert_eq!(fetched.objects, original.objects);
        assert!(fetched.meta.is_none());
    }

    #[tokio::test]
    async fn test_store_idempotent() {
        let (content, store) = store();
        let a = store.store(&packet(1)).await.unwrap();
        let b = store.store(&packet(1)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(content.blob_count(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_missing() {
        let (_, store) = store();
        let id = packet(1).content_id().unwrap();
        assert!(matches!(
            store.retrieve(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_detects_corruption() {
        let (content, store) = store();
        let id = packet(1).content_id().unwrap();
        content
            .put(&id, Bytes::from(packet(2).to_bytes().unwrap()))
            .await
            .unwrap();

        assert!(matches!(
            store.retrieve(&id).await,
            Err(StoreError::InvalidData(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieve_timeout() {
        let content = Arc::new(MemoryContentStore::with_latency(Duration::from_secs(60)));
        let store = PacketStore::new(
            content.clone(),
            PacketStoreConfig {
                timeout: Duration::from_millis(500),
            },
        );
        let id = store.store(&packet(1)).await.unwrap();

        let err = store.retrieve(&id).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            StoreError::RetrieveTimeout { timeout_ms: 500, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_timeout_then_retry() {
        let content = Arc::new(MemoryContentStore::with_latency(Duration::from_secs(60)));
        let store = PacketStore::new(
            content.clone(),
            PacketStoreConfig {
                timeout: Duration::from_secs(1),
            },
        );
        let id = store.store(&packet(1)).await.unwrap();

        let err = store.pin(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::PinTimeout { .. }));
        assert!(!content.is_pinned(&id));

        content.set_latency(None);
        store.pin(&id).await.unwrap();
        assert!(content.is_pinned(&id));
    }

    #[tokio::test]
    async fn test_unpin_not_pinned() {
        let (_, store) = store();
        let id = store.store(&packet(1)).await.unwrap();

        assert!(store.unpin(&id).await.unwrap_err().is_not_pinned());
        assert!(!store.unpin_if_pinned(&id).await.unwrap());

        store.pin(&id).await.unwrap();
        assert!(store.unpin_if_pinned(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unpin_all() {
        let (content, store) = store();
        for n in 0..3 {
            let id = store.store(&packet(n)).await.unwrap();
            store.pin(&id).await.unwrap();
        }
        let direct = store.store(&packet(10)).await.unwrap();
        content.pin_add(&direct, false).await.unwrap();

        assert_eq!(store.pinned().await.unwrap().len(), 3);
        assert_eq!(store.unpin_all().await.unwrap(), 3);
        assert!(store.pinned().await.unwrap().is_empty());
        // direct pins are not ours to sweep
        assert!(content.is_pinned(&direct));
    }

    #[tokio::test]
    async fn test_unpin_all_surfaces_failure() {
        let (content, store) = store();
        let id = store.store(&packet(1)).await.unwrap();
        store.pin(&id).await.unwrap();

        content.set_unavailable(true);
        assert!(matches!(
            store.unpin_all().await,
            Err(StoreError::Backend(_))
        ));
    }
}
