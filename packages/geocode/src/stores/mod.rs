//! Persistence for the geocode cache.
//!
//! The cache only needs a flat string key-value store with get, set and
//! delete-by-prefix. Backends:
//! - `MemoryStore`: always available, lost on exit
//! - `SqliteStore`: file-backed, behind the `sqlite` feature

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::StoreResult;

/// Flat string key-value storage.
///
/// Writes for a key are idempotent, so last-writer-wins is fine and no
/// transactions are needed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete every key starting with `prefix`. Returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<usize>;

    /// Number of stored keys.
    async fn len(&self) -> StoreResult<usize>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<usize> {
        (**self).delete_prefix(prefix).await
    }

    async fn len(&self) -> StoreResult<usize> {
        (**self).len().await
    }
}
