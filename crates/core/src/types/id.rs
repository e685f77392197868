//! Newtype IDs for type-safe entity references.
//!
//! ChezFlora stores everything as JSON documents, so IDs are strings: slugs
//! for categories, UUIDs for most records, and `ORD-...` codes for orders.
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! mixing IDs from different entity types.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]` (usable as a JSON map key)
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `new()`, `generate()` (random UUID v4), `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `From<String>` and `From<&str>`
///
/// # Example
///
/// ```rust
/// # use chezflora_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("u-1");
/// let order_id = OrderId::new("u-1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// assert_eq!(user_id.as_str(), order_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::types::id::random_id())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

/// Random identifier used by `define_id!`-generated `generate()` methods.
#[doc(hidden)]
#[must_use]
pub fn random_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// Define standard entity IDs
define_id!(UserId);
define_id!(CategoryId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(AddressId);
define_id!(PostId);
define_id!(CommentId);
define_id!(SubscriberId);
define_id!(AuditLogId);
define_id!(QuoteId);

impl CategoryId {
    /// Sentinel category that receives products orphaned by deleting a root category.
    pub const UNCATEGORIZED: &'static str = "uncategorized";

    /// The sentinel `uncategorized` category id.
    #[must_use]
    pub fn uncategorized() -> Self {
        Self::new(Self::UNCATEGORIZED)
    }

    /// Whether this is the `uncategorized` sentinel.
    #[must_use]
    pub fn is_uncategorized(&self) -> bool {
        self.0 == Self::UNCATEGORIZED
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ProductId::generate(), ProductId::generate());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = CategoryId::new("roses");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"roses\"");
    }

    #[test]
    fn test_id_works_as_json_map_key() {
        let mut carts: BTreeMap<UserId, Vec<u32>> = BTreeMap::new();
        carts.insert(UserId::new("alice"), vec![1, 2]);

        let json = serde_json::to_string(&carts).unwrap();
        assert_eq!(json, r#"{"alice":[1,2]}"#);

        let back: BTreeMap<UserId, Vec<u32>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, carts);
    }

    #[test]
    fn test_uncategorized_sentinel() {
        assert!(CategoryId::uncategorized().is_uncategorized());
        assert!(!CategoryId::new("roses").is_uncategorized());
    }
}
