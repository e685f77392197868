//! Newsletter subscriber repository.

use super::{Collection, KvStore, RepositoryError, keys};
use crate::models::newsletter::Subscriber;

const SUBSCRIBERS: Collection<Vec<Subscriber>> = Collection::new(keys::NEWSLETTER_SUBSCRIBERS);

/// Repository for newsletter subscriptions.
pub struct SubscriberRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> SubscriberRepository<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        SUBSCRIBERS.read(self.store).await
    }

    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate<R, E, F>(&self, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<Subscriber>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        SUBSCRIBERS.mutate(self.store, apply).await
    }
}
