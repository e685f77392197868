//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Entry, KvStore, RepositoryError, Version};

/// Volatile [`KvStore`] backed by a `HashMap`.
///
/// Cloning shares the underlying map. Used by tests and by the storefront when
/// no database is configured. Versions come from one store-wide counter, so a
/// removed and re-created key never reuses a version handed out before.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    last_version: Version,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        Ok(self.inner.read().await.entries.get(key).cloned())
    }

    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        expected: Version,
    ) -> Result<Version, RepositoryError> {
        let mut inner = self.inner.write().await;
        let current = inner
            .entries
            .get(key)
            .map_or(Version::ABSENT, |entry| entry.version);
        if current != expected {
            return Err(RepositoryError::Conflict(key.to_owned()));
        }

        let version = inner.last_version.next();
        inner.last_version = version;
        inner.entries.insert(key.to_owned(), Entry { value, version });
        Ok(version)
    }

    async fn remove(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        Ok(self.inner.write().await.entries.remove(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_load_missing_key() {
        let store = MemoryStore::new();
        assert!(store.load("products").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_versions_increment() {
        let store = MemoryStore::new();
        let v1 = store.store("k", json!([1]), Version::ABSENT).await.unwrap();
        let v2 = store.store("k", json!([1, 2]), v1).await.unwrap();
        assert_eq!(v1, Version::new(1));
        assert_eq!(v2, Version::new(2));

        let entry = store.load("k").await.unwrap().unwrap();
        assert_eq!(entry.value, json!([1, 2]));
        assert_eq!(entry.version, v2);
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = MemoryStore::new();
        let v1 = store.store("k", json!("a"), Version::ABSENT).await.unwrap();
        store.store("k", json!("b"), v1).await.unwrap();

        let err = store.store("k", json!("c"), v1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(key) if key == "k"));
        assert_eq!(store.load("k").await.unwrap().unwrap().value, json!("b"));
    }

    #[tokio::test]
    async fn test_remove_takes_value() {
        let store = MemoryStore::new();
        store.store("k", json!(1), Version::ABSENT).await.unwrap();

        let taken = store.remove("k").await.unwrap().unwrap();
        assert_eq!(taken.value, json!(1));
        assert!(store.remove("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recreated_key_rejects_stale_version() {
        let store = MemoryStore::new();
        let v1 = store.store("k", json!("a"), Version::ABSENT).await.unwrap();
        store.remove("k").await.unwrap();
        let recreated = store.store("k", json!("b"), Version::ABSENT).await.unwrap();
        assert_ne!(recreated, v1);

        let err = store.store("k", json!("stale"), v1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.load("k").await.unwrap().unwrap().value, json!("b"));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.store("k", json!(true), Version::ABSENT).await.unwrap();
        assert_eq!(other.len().await, 1);
    }
}
