//! Address book repository.

use chezflora_core::UserId;

use super::{Collection, KvStore, PerUser, RepositoryError, keys};
use crate::models::address::Address;

const ADDRESSES: Collection<PerUser<Address>> = Collection::new(keys::USER_ADDRESSES);

/// Repository for customers' saved addresses.
pub struct AddressRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> AddressRepository<'a, S> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// A customer's addresses in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        ADDRESSES.read_user(self.store, user_id).await
    }

    /// Read-modify-write a customer's address list.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate<R, E, F>(&self, user_id: &UserId, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<Address>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        ADDRESSES.mutate_user(self.store, user_id, apply).await
    }
}
