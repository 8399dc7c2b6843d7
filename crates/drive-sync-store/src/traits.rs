//! Collaborator traits: the content store and the document collection.
//!
//! The sync core never talks to a concrete backend. A content-addressed
//! block store sits behind [`ContentStore`]; the checkpoint record lives in
//! a [`DocumentCollection`]. Implementations include in-memory (for tests)
//! and SQLite (documents only).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use drive_sync_core::ContentId;
use serde_json::Value as Document;

use crate::error::Result;

/// How an address is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    /// Pinned together with everything it links to.
    Recursive,
    /// Only the block itself is pinned.
    Direct,
}

impl PinKind {
    pub fn from_recursive(recursive: bool) -> Self {
        if recursive {
            PinKind::Recursive
        } else {
            PinKind::Direct
        }
    }
}

/// One row of a pin listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinEntry {
    pub address: ContentId,
    pub kind: PinKind,
}

/// A content-addressed block store with pinning.
///
/// # Design Notes
///
/// - **Caller-chosen address**: `put` stores bytes under the identifier the
///   caller computed. Writing the same address twice is idempotent.
/// - **Timeouts**: `get` receives a hint, but callers enforce their own
///   deadline; an implementation may hang.
/// - **Unpin of absent pin**: must fail with [`StoreError::NotPinned`] so
///   reconciliation can tell it apart from real failures.
///
/// [`StoreError::NotPinned`]: crate::StoreError::NotPinned
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `id` and return the address written.
    async fn put(&self, id: &ContentId, bytes: Bytes) -> Result<ContentId>;

    /// Fetch the bytes stored under `id`.
    async fn get(&self, id: &ContentId, timeout_hint: Duration) -> Result<Bytes>;

    /// Pin `id` so it is retained.
    async fn pin_add(&self, id: &ContentId, recursive: bool) -> Result<()>;

    /// Remove the pin on `id`.
    async fn pin_remove(&self, id: &ContentId, recursive: bool) -> Result<()>;

    /// List every pinned address.
    async fn pin_list(&self) -> Result<Vec<PinEntry>>;
}

#[async_trait]
impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    async fn put(&self, id: &ContentId, bytes: Bytes) -> Result<ContentId> {
        (**self).put(id, bytes).await
    }

    async fn get(&self, id: &ContentId, timeout_hint: Duration) -> Result<Bytes> {
        (**self).get(id, timeout_hint).await
    }

    async fn pin_add(&self, id: &ContentId, recursive: bool) -> Result<()> {
        (**self).pin_add(id, recursive).await
    }

    async fn pin_remove(&self, id: &ContentId, recursive: bool) -> Result<()> {
        (**self).pin_remove(id, recursive).await
    }

    async fn pin_list(&self) -> Result<Vec<PinEntry>> {
        (**self).pin_list().await
    }
}

/// A keyed collection of JSON documents.
///
/// The sync checkpoint is one record in such a collection.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Fetch the document stored under `id`, if any.
    async fn find_one(&self, id: &str) -> Result<Option<Document>>;

    /// Insert or replace the document stored under `id`.
    async fn upsert(&self, id: &str, document: Document) -> Result<()>;

    /// Delete the document under `id`. Returns whether one existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
impl<T: DocumentCollection + ?Sized> DocumentCollection for Arc<T> {
    async fn find_one(&self, id: &str) -> Result<Option<Document>> {
        (**self).find_one(id).await
    }

    async fn upsert(&self, id: &str, document: Document) -> Result<()> {
        (**self).upsert(id, document).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        (**self).delete(id).await
    }
}
