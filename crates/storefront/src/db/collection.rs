//! Typed access to JSON collections.
//!
//! A [`Collection`] binds a storage key to a serde type. Reads are lenient:
//! a corrupt document is logged and treated as empty so listing pages keep
//! working. Writes are strict: [`Collection::mutate`] refuses to overwrite a
//! document it cannot decode, and uses the key's version token so concurrent
//! writers never silently lose each other's changes.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use chezflora_core::UserId;

use super::{KvStore, RepositoryError, Version};

/// Per-user collections are stored as one map from user id to that user's list.
pub type PerUser<T> = BTreeMap<UserId, Vec<T>>;

/// How many times a write is re-applied after losing a version race.
///
/// Every lost race means another writer committed, so a writer only runs out
/// of attempts when this many commits land inside its own retry window.
const MAX_WRITE_ATTEMPTS: u32 = 32;

/// Upper bound on the pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_millis(25);

/// Jittered exponential pause before retry number `attempt`.
fn backoff(attempt: u32) -> Duration {
    let ceiling = Duration::from_micros(250)
        .saturating_mul(1 << attempt.min(8))
        .min(MAX_BACKOFF);
    let jitter = rand::rng().random_range(0.5..=1.0);
    ceiling.mul_f64(jitter)
}

/// A typed JSON document stored under a fixed key.
pub struct Collection<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Collection<T> {}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Default + Send,
{
    /// Bind `key` to type `T`.
    #[must_use]
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// The storage key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Read the current document, or `T::default()` if absent or undecodable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` only if the backend itself fails.
    pub async fn read<S: KvStore>(&self, store: &S) -> Result<T, RepositoryError> {
        let Some(entry) = store.load(self.key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key = self.key, error = %e, "Stored collection is corrupt, reading as empty");
                Ok(T::default())
            }
        }
    }

    /// Read-modify-write the document with an optimistic version check.
    ///
    /// `apply` may run more than once: if another writer commits between our
    /// read and write, the document is re-read and `apply` is re-run against
    /// the fresh value. It must therefore only touch the document and its own
    /// return value. Returning `Err` from `apply` aborts without writing.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply`, `RepositoryError::DataCorruption` if the
    /// stored document cannot be decoded, or `RepositoryError::Conflict` if
    /// every attempt lost a race. Lost races are retried after a short
    /// jittered pause.
    pub async fn mutate<S, R, E, F>(&self, store: &S, mut apply: F) -> Result<R, E>
    where
        S: KvStore,
        F: FnMut(&mut T) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut value, original, version) = match store.load(self.key).await? {
                Some(entry) => {
                    let decoded: T = serde_json::from_value(entry.value.clone()).map_err(|e| {
                        RepositoryError::DataCorruption(format!("{}: {e}", self.key))
                    })?;
                    (decoded, Some(entry.value), entry.version)
                }
                None => (T::default(), None, Version::ABSENT),
            };

            let outcome = apply(&mut value)?;

            let encoded = serde_json::to_value(&value).map_err(RepositoryError::from)?;
            if original.as_ref() == Some(&encoded) {
                return Ok(outcome);
            }

            match store.store(self.key, encoded, version).await {
                Ok(_) => return Ok(outcome),
                Err(RepositoryError::Conflict(_)) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(key = self.key, attempt, "Version conflict, retrying write");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RepositoryError::Conflict(self.key.to_owned()).into())
    }

    /// Remove the document entirely, returning its decoded value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn take<S: KvStore>(&self, store: &S) -> Result<T, RepositoryError> {
        let Some(entry) = store.remove(self.key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key = self.key, error = %e, "Discarding corrupt collection");
                Ok(T::default())
            }
        }
    }
}

impl<T> Collection<PerUser<T>>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// Read one user's list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` only if the backend itself fails.
    pub async fn read_user<S: KvStore>(
        &self,
        store: &S,
        user_id: &UserId,
    ) -> Result<Vec<T>, RepositoryError> {
        Ok(self.read(store).await?.remove(user_id).unwrap_or_default())
    }

    /// Read-modify-write one user's list. An emptied list is dropped from the map.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::mutate`].
    pub async fn mutate_user<S, R, E, F>(
        &self,
        store: &S,
        user_id: &UserId,
        mut apply: F,
    ) -> Result<R, E>
    where
        S: KvStore,
        F: FnMut(&mut Vec<T>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        self.mutate(store, |all| {
            let items = all.entry(user_id.clone()).or_default();
            let outcome = apply(items);
            if items.is_empty() {
                all.remove(user_id);
            }
            outcome
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;

    const NUMBERS: Collection<Vec<u32>> = Collection::new("numbers");

    #[tokio::test]
    async fn test_read_missing_is_default() {
        let store = MemoryStore::new();
        assert!(NUMBERS.read(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutate_persists_and_returns_outcome() {
        let store = MemoryStore::new();
        let len = NUMBERS
            .mutate(&store, |numbers| {
                numbers.push(4);
                Ok::<_, RepositoryError>(numbers.len())
            })
            .await
            .unwrap();
        assert_eq!(len, 1);
        assert_eq!(NUMBERS.read(&store).await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_mutate_error_aborts_write() {
        let store = MemoryStore::new();
        let result: Result<(), RepositoryError> = NUMBERS
            .mutate(&store, |numbers| {
                numbers.push(1);
                Err(RepositoryError::DataCorruption("nope".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(store.load("numbers").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unchanged_document_is_not_rewritten() {
        let store = MemoryStore::new();
        store.store("numbers", json!([1]), Version::ABSENT).await.unwrap();

        NUMBERS
            .mutate(&store, |_| Ok::<_, RepositoryError>(()))
            .await
            .unwrap();
        let entry = store.load("numbers").await.unwrap().unwrap();
        assert_eq!(entry.version, Version::new(1));
    }

    #[tokio::test]
    async fn test_corrupt_document_reads_empty_but_blocks_writes() {
        let store = MemoryStore::new();
        store
            .store("numbers", json!({"not": "a list"}), Version::ABSENT)
            .await
            .unwrap();

        assert!(NUMBERS.read(&store).await.unwrap().is_empty());

        let err = NUMBERS
            .mutate(&store, |numbers| {
                numbers.push(1);
                Ok::<_, RepositoryError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_backoff_is_bounded() {
        for attempt in 1..MAX_WRITE_ATTEMPTS {
            let pause = backoff(attempt);
            assert!(pause > Duration::ZERO);
            assert!(pause <= MAX_BACKOFF);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_mutations_are_not_lost() {
        let store = MemoryStore::new();
        let tasks: Vec<_> = (0..24u32)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    NUMBERS
                        .mutate(&store, |numbers| {
                            numbers.push(n);
                            Ok::<_, RepositoryError>(())
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut numbers = NUMBERS.read(&store).await.unwrap();
        numbers.sort_unstable();
        assert_eq!(numbers, (0..24).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_per_user_lists_are_isolated() {
        const LISTS: Collection<PerUser<u32>> = Collection::new("lists");
        let store = MemoryStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        LISTS
            .mutate_user(&store, &alice, |items| {
                items.push(1);
                Ok::<_, RepositoryError>(())
            })
            .await
            .unwrap();
        assert_eq!(LISTS.read_user(&store, &alice).await.unwrap(), vec![1]);
        assert!(LISTS.read_user(&store, &bob).await.unwrap().is_empty());

        LISTS
            .mutate_user(&store, &alice, |items| {
                items.clear();
                Ok::<_, RepositoryError>(())
            })
            .await
            .unwrap();
        assert!(LISTS.read(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_take_removes_document() {
        let store = MemoryStore::new();
        store.store("numbers", json!([7, 8]), Version::ABSENT).await.unwrap();
        assert_eq!(NUMBERS.take(&store).await.unwrap(), vec![7, 8]);
        assert!(NUMBERS.take(&store).await.unwrap().is_empty());
    }
}
