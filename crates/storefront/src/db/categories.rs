//! Category repository.

use chezflora_core::CategoryId;

use super::{Collection, KvStore, RepositoryError, keys};
use crate::models::category::Category;

const CATEGORIES: Collection<Vec<Category>> = Collection::new(keys::CATEGORIES);

/// Repository for product categories.
pub struct CategoryRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> CategoryRepository<'a, S> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every category as a flat list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        CATEGORIES.read(self.store).await
    }

    /// Get a category by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn get(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|c| &c.id == id))
    }

    /// Read-modify-write the category list.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate<R, E, F>(&self, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<Category>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        CATEGORIES.mutate(self.store, apply).await
    }
}
