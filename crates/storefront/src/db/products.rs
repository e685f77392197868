//! Product repository.

use chrono::Utc;

use chezflora_core::ProductId;

use super::{Collection, KvStore, RepositoryError, keys};
use crate::models::product::Product;

const PRODUCTS: Collection<Vec<Product>> = Collection::new(keys::PRODUCTS);

/// Repository for the product catalog.
pub struct ProductRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> ProductRepository<'a, S> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every product, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        PRODUCTS.read(self.store).await
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|p| &p.id == id))
    }

    /// Read-modify-write the whole product list.
    ///
    /// See [`Collection::mutate`] for retry semantics.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate<R, E, F>(&self, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<Product>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        PRODUCTS.mutate(self.store, apply).await
    }

    /// Apply `change` to one product and bump its `updated_at`.
    ///
    /// # Returns
    ///
    /// The updated product, or `None` if no product has this ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn update<F>(&self, id: &ProductId, mut change: F) -> Result<Option<Product>, RepositoryError>
    where
        F: FnMut(&mut Product) + Send,
    {
        self.mutate(|products| {
            let Some(product) = products.iter_mut().find(|p| &p.id == id) else {
                return Ok(None);
            };
            change(product);
            product.updated_at = Utc::now();
            Ok(Some(product.clone()))
        })
        .await
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        self.mutate(|products| {
            let before = products.len();
            products.retain(|p| &p.id != id);
            Ok(products.len() != before)
        })
        .await
    }
}
