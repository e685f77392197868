//! Session-scoped key-value store.
//!
//! Anonymous visitors get a guest cart that lives exactly as long as their
//! browsing session. Rather than keeping a parallel table keyed by session id,
//! the values are stored inside the tower-sessions session itself.

use tower_sessions::Session;

use super::{Entry, KvStore, RepositoryError, Version};

/// Prefix separating store entries from other session keys.
const PREFIX: &str = "kv:";

/// Session key holding the last version handed out in this session.
const LAST_VERSION: &str = "kv#last_version";

/// [`KvStore`] view over one visitor's session.
///
/// Version checks are not atomic across concurrent requests from the same
/// session; the scope is a single visitor, so last write wins there.
#[derive(Clone, Debug)]
pub struct SessionKv {
    session: Session,
}

impl SessionKv {
    /// Wrap the current request's session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

fn session_key(key: &str) -> String {
    format!("{PREFIX}{key}")
}

impl KvStore for SessionKv {
    async fn load(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        Ok(self.session.get::<Entry>(&session_key(key)).await?)
    }

    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        expected: Version,
    ) -> Result<Version, RepositoryError> {
        let key = session_key(key);
        let current = self
            .session
            .get::<Entry>(&key)
            .await?
            .map_or(Version::ABSENT, |entry| entry.version);
        if current != expected {
            return Err(RepositoryError::Conflict(key));
        }

        let last = self
            .session
            .get::<Version>(LAST_VERSION)
            .await?
            .unwrap_or(Version::ABSENT);
        let version = last.max(expected).next();
        self.session.insert(LAST_VERSION, version).await?;
        self.session.insert(&key, Entry { value, version }).await?;
        Ok(version)
    }

    async fn remove(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        Ok(self.session.remove::<Entry>(&session_key(key)).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tower_sessions::MemoryStore as SessionMemoryStore;

    use super::*;

    fn kv() -> SessionKv {
        let store = Arc::new(SessionMemoryStore::default());
        SessionKv::new(Session::new(None, store, None))
    }

    #[tokio::test]
    async fn test_round_trip_through_session() {
        let kv = kv();
        let v1 = kv.store("guest_cart", json!([1]), Version::ABSENT).await.unwrap();
        let entry = kv.load("guest_cart").await.unwrap().unwrap();
        assert_eq!(entry.value, json!([1]));
        assert_eq!(entry.version, v1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let kv = kv();
        kv.store("guest_cart", json!([1]), Version::ABSENT).await.unwrap();
        let err = kv.store("guest_cart", json!([2]), Version::ABSENT).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_recreated_key_rejects_stale_version() {
        let kv = kv();
        let v1 = kv.store("guest_cart", json!([1]), Version::ABSENT).await.unwrap();
        kv.remove("guest_cart").await.unwrap();
        let v2 = kv.store("guest_cart", json!([2]), Version::ABSENT).await.unwrap();
        assert!(v2 > v1);

        let err = kv.store("guest_cart", json!([3]), v1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(kv.load("guest_cart").await.unwrap().unwrap().value, json!([2]));
    }

    #[tokio::test]
    async fn test_remove_takes_entry_once() {
        let kv = kv();
        kv.store("guest_cart", json!([1]), Version::ABSENT).await.unwrap();
        assert!(kv.remove("guest_cart").await.unwrap().is_some());
        assert!(kv.remove("guest_cart").await.unwrap().is_none());
    }
}
