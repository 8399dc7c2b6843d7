//! SQLite implementation of [`DocumentCollection`].
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Several collections can share one
//! database file: each handle is scoped to a collection name.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as Document;

use drive_sync_core::now_millis;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::DocumentCollection;

/// SQLite-backed document collection.
///
/// Thread-safe via internal Mutex. Cloning yields another handle on the
/// same collection.
#[derive(Clone)]
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteCollection {
    /// Open a SQLite database at `path` scoped to `collection`.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.into(),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory(collection: impl Into<String>) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.into(),
        })
    }

    /// Another collection in the same database.
    pub fn sibling(&self, collection: impl Into<String>) -> Self {
        Self {
            conn: self.conn.clone(),
            collection: collection.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.collection
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        let collection = self.collection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("mutex poisoned: {}", e)))?;
            f(&conn, &collection)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("spawn_blocking failed: {}", e)))?
    }
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    async fn find_one(&self, id: &str) -> Result<Option<Document>> {
        let id = id.to_string();
        self.blocking(move |conn, collection| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;

            body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
                .transpose()
        })
        .await
    }

    async fn upsert(&self, id: &str, document: Document) -> Result<()> {
        let id = id.to_string();
        let body = serde_json::to_string(&document)?;
        self.blocking(move |conn, collection| {
            conn.execute(
                "INSERT INTO documents (collection, id, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (collection, id)
                 DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![collection, id, body, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.blocking(move |conn, collection| {
            let n = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            Ok(n > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_and_find() {
        let coll = SqliteCollection::open_memory("sync_state").unwrap();
        assert!(coll.find_one("x").await.unwrap().is_none());

        coll.upsert("x", json!({"a": [1, 2]})).await.unwrap();
        assert_eq!(coll.find_one("x").await.unwrap(), Some(json!({"a": [1, 2]})));

        coll.upsert("x", json!({"a": []})).await.unwrap();
        assert_eq!(coll.find_one("x").await.unwrap(), Some(json!({"a": []})));
    }

    #[tokio::test]
    async fn test_delete() {
        let coll = SqliteCollection::open_memory("sync_state").unwrap();
        coll.upsert("x", json!(1)).await.unwrap();
        assert!(coll.delete("x").await.unwrap());
        assert!(!coll.delete("x").await.unwrap());
        assert!(coll.find_one("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let a = SqliteCollection::open_memory("a").unwrap();
        let b = a.sibling("b");

        a.upsert("doc", json!("from a")).await.unwrap();
        assert!(b.find_one("doc").await.unwrap().is_none());

        b.upsert("doc", json!("from b")).await.unwrap();
        assert_eq!(a.find_one("doc").await.unwrap(), Some(json!("from a")));
        assert_eq!(b.find_one("doc").await.unwrap(), Some(json!("from b")));
    }
}
