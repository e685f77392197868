//! Customer address book entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::{AddressId, AddressType};

use super::deserialize_some;

/// A saved shipping or billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(rename = "type")]
    pub address_type: AddressType,
    #[serde(default)]
    pub nickname: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub street: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for creating an address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[serde(rename = "type")]
    pub address_type: AddressType,
    #[serde(default)]
    pub nickname: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub street: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Make this the default for its type.
    #[serde(default)]
    pub is_default: bool,
}

/// Partial update of an address. Absent fields are left unchanged.
///
/// The type and default flag are not editable here; default changes go
/// through the dedicated operation so the one-default rule holds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressUpdate {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub nickname: Option<Option<String>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub company: Option<Option<String>>,
    pub street: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub street2: Option<Option<String>>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
}

impl AddressUpdate {
    /// Apply the present fields to `address`.
    pub fn apply_to(self, address: &mut Address) {
        if let Some(nickname) = self.nickname {
            address.nickname = nickname;
        }
        if let Some(first_name) = self.first_name {
            address.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            address.last_name = last_name;
        }
        if let Some(company) = self.company {
            address.company = company;
        }
        if let Some(street) = self.street {
            address.street = street;
        }
        if let Some(street2) = self.street2 {
            address.street2 = street2;
        }
        if let Some(postal_code) = self.postal_code {
            address.postal_code = postal_code;
        }
        if let Some(city) = self.city {
            address.city = city;
        }
        if let Some(country) = self.country {
            address.country = country;
        }
        if let Some(phone) = self.phone {
            address.phone = phone;
        }
    }
}
