//! In-memory implementations of the collaborator traits.
//!
//! These are primarily for testing. They follow the same contracts as the
//! real backends but keep everything in memory with no persistence, and
//! expose a few knobs for injecting latency and failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use drive_sync_core::ContentId;
use serde_json::Value as Document;

use crate::error::{Result, StoreError};
use crate::traits::{ContentStore, DocumentCollection, PinEntry, PinKind};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

/// In-memory content store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryContentStore {
    inner: RwLock<ContentInner>,
    /// Delay applied before answering `get` and `pin_add`.
    latency: Mutex<Option<Duration>>,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct ContentInner {
    blobs: HashMap<ContentId, Bytes>,
    pins: HashMap<ContentId, PinKind>,
}

impl MemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ContentInner::default()),
            latency: Mutex::new(None),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create a store that answers retrieves and pins after `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        let store = Self::new();
        store.set_latency(Some(latency));
        store
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Make every operation fail with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.read()
            .map(|inner| inner.blobs.contains_key(id))
            .unwrap_or(false)
    }

    pub fn blob_count(&self) -> usize {
        self.read().map(|inner| inner.blobs.len()).unwrap_or(0)
    }

    pub fn is_pinned(&self, id: &ContentId) -> bool {
        self.read()
            .map(|inner| inner.pins.contains_key(id))
            .unwrap_or(false)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ContentInner>> {
        self.inner.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ContentInner>> {
        self.inner.write().map_err(poisoned)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("content store unavailable".into()));
        }
        Ok(())
    }

    async fn delay(&self) {
        let latency = self.latency.lock().ok().and_then(|guard| *guard);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, id: &ContentId, bytes: Bytes) -> Result<ContentId> {
        self.check_available()?;
        let mut inner = self.write()?;
        inner.blobs.entry(*id).or_insert(bytes);
        Ok(*id)
    }

    async fn get(&self, id: &ContentId, _timeout_hint: Duration) -> Result<Bytes> {
        self.check_available()?;
        self.delay().await;
        let inner = self.read()?;
        inner
            .blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn pin_add(&self, id: &ContentId, recursive: bool) -> Result<()> {
        self.check_available()?;
        self.delay().await;
        let mut inner = self.write()?;
        if !inner.blobs.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let kind = PinKind::from_recursive(recursive);
        match inner.pins.get(id) {
            // A recursive pin already covers a direct request.
            Some(PinKind::Recursive) => {}
            _ => {
                inner.pins.insert(*id, kind);
            }
        }
        Ok(())
    }

    async fn pin_remove(&self, id: &ContentId, recursive: bool) -> Result<()> {
        self.check_available()?;
        let mut inner = self.write()?;
        match inner.pins.get(id) {
            None => Err(StoreError::NotPinned(id.to_string())),
            Some(PinKind::Recursive) if !recursive => Err(StoreError::Backend(format!(
                "{} is pinned recursively",
                id
            ))),
            Some(_) => {
                inner.pins.remove(id);
                Ok(())
            }
        }
    }

    async fn pin_list(&self) -> Result<Vec<PinEntry>> {
        self.check_available()?;
        let inner = self.read()?;
        let mut entries: Vec<PinEntry> = inner
            .pins
            .iter()
            .map(|(address, kind)| PinEntry {
                address: *address,
                kind: *kind,
            })
            .collect();
        entries.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(entries)
    }
}

/// In-memory document collection.
pub struct MemoryCollection {
    documents: RwLock<HashMap<String, Document>>,
    unavailable: AtomicBool,
    /// Delay applied before answering `find_one`.
    find_latency: Mutex<Option<Duration>>,
    /// Number of `find_one` calls served, failed ones included.
    finds: AtomicUsize,
    finds_in_flight: AtomicUsize,
    max_finds_in_flight: AtomicUsize,
}

/// Counts a `find_one` as in flight until dropped, cancellation included.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            find_latency: Mutex::new(None),
            finds: AtomicUsize::new(0),
            finds_in_flight: AtomicUsize::new(0),
            max_finds_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delay every `find_one` by `latency`. `None` answers at once.
    pub fn set_find_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.find_latency.lock() {
            *guard = latency;
        }
    }

    /// Make every operation fail with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Most `find_one` calls ever running at the same time.
    pub fn max_concurrent_finds(&self) -> usize {
        self.max_finds_in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("document collection unavailable".into()));
        }
        Ok(())
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find_one(&self, id: &str) -> Result<Option<Document>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.finds_in_flight, &self.max_finds_in_flight);

        let latency = self.find_latency.lock().ok().and_then(|guard| *guard);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.check_available()?;
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.get(id).cloned())
    }

    async fn upsert(&self, id: &str, document: Document) -> Result<()> {
        self.check_available()?;
        let mut docs = self.documents.write().map_err(poisoned)?;
        docs.insert(id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.check_available()?;
        let mut docs = self.documents.write().map_err(poisoned)?;
        Ok(docs.remove(id).is_some())
    }
}
