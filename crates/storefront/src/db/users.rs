//! User repository.

use chezflora_core::{Email, UserId};

use super::{Collection, KvStore, RepositoryError, keys};
use crate::models::user::User;

const USERS: Collection<Vec<User>> = Collection::new(keys::USERS);

/// Repository for user accounts.
pub struct UserRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> UserRepository<'a, S> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        USERS.read(self.store).await
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|u| &u.id == id))
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|u| &u.email == email))
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        USERS
            .mutate(self.store, |users| {
                if users.iter().any(|u| u.email == user.email) {
                    return Err(RepositoryError::Conflict(user.email.to_string()));
                }
                users.push(user.clone());
                Ok(())
            })
            .await
    }

    /// Apply `change` to one user.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if no user has this ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn update<F>(&self, id: &UserId, mut change: F) -> Result<Option<User>, RepositoryError>
    where
        F: FnMut(&mut User) + Send,
    {
        USERS
            .mutate(self.store, |users| {
                Ok(users.iter_mut().find(|u| &u.id == id).map(|user| {
                    change(user);
                    user.updated_at = chrono::Utc::now();
                    user.clone()
                }))
            })
            .await
    }

    /// Delete a user.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        USERS
            .mutate(self.store, |users| {
                let before = users.len();
                users.retain(|u| &u.id != id);
                Ok(users.len() != before)
            })
            .await
    }
}
