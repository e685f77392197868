//! Quote request repository.

use chezflora_core::{QuoteId, UserId};

use super::{Collection, KvStore, PerUser, RepositoryError, keys};
use crate::models::quote::Quote;

const QUOTES: Collection<PerUser<Quote>> = Collection::new(keys::QUOTES);

/// Repository for quote requests, grouped by customer.
pub struct QuoteRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> QuoteRepository<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Quote>, RepositoryError> {
        QUOTES.read_user(self.store, user_id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list_all(&self) -> Result<Vec<Quote>, RepositoryError> {
        Ok(QUOTES.read(self.store).await?.into_values().flatten().collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        QUOTES
            .mutate_user(self.store, &quote.user_id, |quotes| {
                quotes.push(quote.clone());
                Ok(())
            })
            .await
    }

    /// Read-modify-write one quote wherever it is stored; `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate_quote<R, E, F>(&self, id: &QuoteId, mut apply: F) -> Result<Option<R>, E>
    where
        F: FnMut(&mut Quote) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        QUOTES
            .mutate(self.store, |all| {
                all.values_mut()
                    .flat_map(|quotes| quotes.iter_mut())
                    .find(|q| &q.id == id)
                    .map(&mut apply)
                    .transpose()
            })
            .await
    }
}
