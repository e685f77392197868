//! Cart repositories.
//!
//! Signed-in users' carts live in the durable store under one map keyed by
//! user id. A guest's cart is a plain list in their session store.

use chezflora_core::UserId;

use super::{Collection, KvStore, PerUser, RepositoryError, keys};
use crate::models::cart::{CartItem, CartScope};

const USER_CARTS: Collection<PerUser<CartItem>> = Collection::new(keys::CART);
const GUEST_CART: Collection<Vec<CartItem>> = Collection::new(keys::GUEST_CART);

/// Durable carts of signed-in users.
pub struct UserCartRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> UserCartRepository<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn items(&self, user_id: &UserId) -> Result<Vec<CartItem>, RepositoryError> {
        USER_CARTS.read_user(self.store, user_id).await
    }

    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate<R, E, F>(&self, user_id: &UserId, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<CartItem>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        USER_CARTS.mutate_user(self.store, user_id, apply).await
    }
}

/// Repository routing cart reads and writes to the scope's store.
pub struct CartRepository<'a, D, G> {
    users: UserCartRepository<'a, D>,
    guest: &'a G,
}

impl<'a, D: KvStore, G: KvStore> CartRepository<'a, D, G> {
    /// Create a cart repository over the durable and session stores.
    #[must_use]
    pub const fn new(durable: &'a D, guest: &'a G) -> Self {
        Self {
            users: UserCartRepository::new(durable),
            guest,
        }
    }

    /// Current lines of the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn items(&self, scope: &CartScope) -> Result<Vec<CartItem>, RepositoryError> {
        match scope {
            CartScope::User(user_id) => self.users.items(user_id).await,
            CartScope::Guest => GUEST_CART.read(self.guest).await,
        }
    }

    /// Read-modify-write the cart's lines.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate<R, E, F>(&self, scope: &CartScope, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<CartItem>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        match scope {
            CartScope::User(user_id) => self.users.mutate(user_id, apply).await,
            CartScope::Guest => GUEST_CART.mutate(self.guest, apply).await,
        }
    }

    /// Remove the guest cart from the session, returning its lines.
    ///
    /// A second call returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the session store fails.
    pub async fn take_guest(&self) -> Result<Vec<CartItem>, RepositoryError> {
        GUEST_CART.take(self.guest).await
    }
}
