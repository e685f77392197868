//! Address book service.
//!
//! Each customer has at most one default address per type. The first
//! address of a type becomes the default, and deleting the default promotes
//! the next remaining address of that type.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use chezflora_core::{AddressId, AddressType, UserId};

use crate::db::addresses::AddressRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::address::{Address, AddressUpdate, NewAddress};

/// Errors that can occur during address book operations.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// A required field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Address book service.
pub struct AddressService<'a, S> {
    addresses: AddressRepository<'a, S>,
}

impl<'a, S: KvStore> AddressService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            addresses: AddressRepository::new(store),
        }
    }

    /// A customer's addresses, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Repository` if the store fails.
    pub async fn list_addresses(
        &self,
        user_id: &UserId,
        address_type: Option<AddressType>,
    ) -> Result<Vec<Address>, AddressError> {
        let mut addresses = self.addresses.list(user_id).await?;
        if let Some(wanted) = address_type {
            addresses.retain(|a| a.address_type == wanted);
        }
        Ok(addresses)
    }

    /// # Errors
    ///
    /// Returns `AddressError::Repository` if the store fails.
    pub async fn get_address(
        &self,
        user_id: &UserId,
        id: &AddressId,
    ) -> Result<Option<Address>, AddressError> {
        Ok(self.addresses.list(user_id).await?.into_iter().find(|a| &a.id == id))
    }

    /// The customer's default address of `address_type`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Repository` if the store fails.
    pub async fn get_default_address(
        &self,
        user_id: &UserId,
        address_type: AddressType,
    ) -> Result<Option<Address>, AddressError> {
        Ok(self
            .addresses
            .list(user_id)
            .await?
            .into_iter()
            .find(|a| a.address_type == address_type && a.is_default))
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::MissingField` if a required field is blank.
    #[instrument(skip(self, data), fields(user_id = %user_id))]
    pub async fn add_address(
        &self,
        user_id: &UserId,
        data: NewAddress,
    ) -> Result<Address, AddressError> {
        validate(
            &data.first_name,
            &data.last_name,
            &data.street,
            &data.postal_code,
            &data.city,
            &data.country,
        )?;

        let now = Utc::now();
        let address = Address {
            id: AddressId::generate(),
            address_type: data.address_type,
            nickname: data.nickname,
            first_name: data.first_name.trim().to_owned(),
            last_name: data.last_name.trim().to_owned(),
            company: data.company,
            street: data.street.trim().to_owned(),
            street2: data.street2,
            postal_code: data.postal_code.trim().to_owned(),
            city: data.city.trim().to_owned(),
            country: data.country.trim().to_owned(),
            phone: data.phone,
            is_default: data.is_default,
            created_at: now,
            updated_at: now,
        };

        self.addresses
            .mutate(user_id, |addresses| {
                let mut address = address.clone();
                let has_default = addresses
                    .iter()
                    .any(|a| a.address_type == address.address_type && a.is_default);
                if !has_default {
                    address.is_default = true;
                }
                if address.is_default {
                    clear_defaults(addresses, address.address_type);
                }
                addresses.push(address.clone());
                Ok(address)
            })
            .await
    }

    /// Edit an address.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::MissingField` if a required field is set blank.
    #[instrument(skip(self, data), fields(user_id = %user_id, address_id = %id))]
    pub async fn update_address(
        &self,
        user_id: &UserId,
        id: &AddressId,
        data: AddressUpdate,
    ) -> Result<Option<Address>, AddressError> {
        self.addresses
            .mutate(user_id, |addresses| {
                let Some(address) = addresses.iter_mut().find(|a| &a.id == id) else {
                    return Ok(None);
                };
                let mut updated = address.clone();
                data.clone().apply_to(&mut updated);
                validate(
                    &updated.first_name,
                    &updated.last_name,
                    &updated.street,
                    &updated.postal_code,
                    &updated.city,
                    &updated.country,
                )?;
                updated.updated_at = Utc::now();
                *address = updated.clone();
                Ok(Some(updated))
            })
            .await
    }

    /// Delete an address, promoting another of its type if it was the default.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Repository` if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %id))]
    pub async fn delete_address(&self, user_id: &UserId, id: &AddressId) -> Result<bool, AddressError> {
        self.addresses
            .mutate(user_id, |addresses| {
                let Some(position) = addresses.iter().position(|a| &a.id == id) else {
                    return Ok(false);
                };
                let removed = addresses.remove(position);
                if removed.is_default
                    && let Some(next) = addresses
                        .iter_mut()
                        .find(|a| a.address_type == removed.address_type)
                {
                    next.is_default = true;
                }
                Ok(true)
            })
            .await
    }

    /// Make an address the default of its type.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Repository` if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %id))]
    pub async fn set_default_address(
        &self,
        user_id: &UserId,
        id: &AddressId,
    ) -> Result<Option<Address>, AddressError> {
        self.addresses
            .mutate(user_id, |addresses| {
                let Some(address_type) = addresses
                    .iter()
                    .find(|a| &a.id == id)
                    .map(|a| a.address_type)
                else {
                    return Ok(None);
                };
                clear_defaults(addresses, address_type);
                let now = Utc::now();
                Ok(addresses.iter_mut().find(|a| &a.id == id).map(|a| {
                    a.is_default = true;
                    a.updated_at = now;
                    a.clone()
                }))
            })
            .await
    }
}

fn clear_defaults(addresses: &mut [Address], address_type: AddressType) {
    for address in addresses.iter_mut().filter(|a| a.address_type == address_type) {
        address.is_default = false;
    }
}

fn validate(
    first_name: &str,
    last_name: &str,
    street: &str,
    postal_code: &str,
    city: &str,
    country: &str,
) -> Result<(), AddressError> {
    let fields = [
        ("firstName", first_name),
        ("lastName", last_name),
        ("street", street),
        ("postalCode", postal_code),
        ("city", city),
        ("country", country),
    ];
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(AddressError::MissingField(*name)),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::address::fixtures::new_address;

    fn defaults(addresses: &[Address], address_type: AddressType) -> usize {
        addresses
            .iter()
            .filter(|a| a.address_type == address_type && a.is_default)
            .count()
    }

    #[tokio::test]
    async fn test_first_address_of_type_becomes_default() {
        let store = MemoryStore::new();
        let book = AddressService::new(&store);
        let user = UserId::new("u1");

        let first = book.add_address(&user, new_address(AddressType::Shipping, "1 rue A")).await.unwrap();
        let second = book.add_address(&user, new_address(AddressType::Shipping, "2 rue B")).await.unwrap();
        let billing = book.add_address(&user, new_address(AddressType::Billing, "3 rue C")).await.unwrap();
        assert!(first.is_default);
        assert!(!second.is_default);
        assert!(billing.is_default);
    }

    #[tokio::test]
    async fn test_one_default_per_type() {
        let store = MemoryStore::new();
        let book = AddressService::new(&store);
        let user = UserId::new("u1");

        book.add_address(&user, new_address(AddressType::Shipping, "1 rue A")).await.unwrap();
        let mut explicit = new_address(AddressType::Shipping, "2 rue B");
        explicit.is_default = true;
        let second = book.add_address(&user, explicit).await.unwrap();

        let all = book.list_addresses(&user, None).await.unwrap();
        assert_eq!(defaults(&all, AddressType::Shipping), 1);
        let default = book.get_default_address(&user, AddressType::Shipping).await.unwrap();
        assert_eq!(default.map(|a| a.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_deleting_default_promotes_next() {
        let store = MemoryStore::new();
        let book = AddressService::new(&store);
        let user = UserId::new("u1");

        let first = book.add_address(&user, new_address(AddressType::Shipping, "1 rue A")).await.unwrap();
        let second = book.add_address(&user, new_address(AddressType::Shipping, "2 rue B")).await.unwrap();
        assert!(book.delete_address(&user, &first.id).await.unwrap());
        assert!(!book.delete_address(&user, &first.id).await.unwrap());

        let default = book.get_default_address(&user, AddressType::Shipping).await.unwrap();
        assert_eq!(default.map(|a| a.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_set_default_and_update() {
        let store = MemoryStore::new();
        let book = AddressService::new(&store);
        let user = UserId::new("u1");

        book.add_address(&user, new_address(AddressType::Billing, "1 rue A")).await.unwrap();
        let second = book.add_address(&user, new_address(AddressType::Billing, "2 rue B")).await.unwrap();
        book.set_default_address(&user, &second.id).await.unwrap().unwrap();
        let all = book.list_addresses(&user, Some(AddressType::Billing)).await.unwrap();
        assert_eq!(defaults(&all, AddressType::Billing), 1);

        let update = AddressUpdate {
            city: Some("Lyon".to_owned()),
            ..AddressUpdate::default()
        };
        let updated = book.update_address(&user, &second.id, update).await.unwrap().unwrap();
        assert_eq!(updated.city, "Lyon");
        assert!(updated.is_default);

        let blank = AddressUpdate {
            street: Some(" ".to_owned()),
            ..AddressUpdate::default()
        };
        assert!(matches!(
            book.update_address(&user, &second.id, blank).await,
            Err(AddressError::MissingField("street"))
        ));
    }
}
