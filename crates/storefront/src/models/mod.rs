//! Domain models for the storefront.
//!
//! Every persisted model serializes with camelCase field names so stored
//! documents stay stable across backends.

pub mod address;
pub mod audit;
pub mod blog;
pub mod cart;
pub mod category;
pub mod newsletter;
pub mod order;
pub mod product;
pub mod quote;
pub mod session;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserialize a present field into `Some`, including an explicit `null`.
///
/// Combined with `#[serde(default)]` this distinguishes an absent field
/// (`None`) from one explicitly cleared (`Some(None)`) in partial updates.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
