//! Order repository.

use chezflora_core::{OrderId, UserId};

use super::{Collection, KvStore, PerUser, RepositoryError, keys};
use crate::models::order::Order;

const ORDERS: Collection<PerUser<Order>> = Collection::new(keys::ORDERS);

/// Repository for placed orders, grouped by customer.
pub struct OrderRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> OrderRepository<'a, S> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// One customer's orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        ORDERS.read_user(self.store, user_id).await
    }

    /// Every order of every customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(ORDERS.read(self.store).await?.into_values().flatten().collect())
    }

    /// Find an order by ID across all customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.list_all().await?.into_iter().find(|o| &o.id == id))
    }

    /// Append an order to its customer's list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        ORDERS
            .mutate_user(self.store, &order.user_id, |orders| {
                orders.push(order.clone());
                Ok(())
            })
            .await
    }

    /// Read-modify-write one order wherever it is stored.
    ///
    /// `apply` is not called when no order has this ID, and the outcome is
    /// then `None`.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate_order<R, E, F>(&self, id: &OrderId, mut apply: F) -> Result<Option<R>, E>
    where
        F: FnMut(&mut Order) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        ORDERS
            .mutate(self.store, |all| {
                all.values_mut()
                    .flat_map(|orders| orders.iter_mut())
                    .find(|o| &o.id == id)
                    .map(&mut apply)
                    .transpose()
            })
            .await
    }
}
