//! Catalog products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::{CategoryId, Money, ProductId};

use super::deserialize_some;

/// A product in the catalog.
///
/// `stock: None` means stock is not tracked and the product is always
/// purchasable; tracked stock is unsigned and therefore never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: Option<u32>,
    pub category: CategoryId,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether inventory is counted for this product.
    #[must_use]
    pub const fn tracks_stock(&self) -> bool {
        self.stock.is_some()
    }

    /// Whether `quantity` units can be supplied from current stock.
    #[must_use]
    pub fn can_supply(&self, quantity: u32) -> bool {
        self.stock.is_none_or(|stock| quantity <= stock)
    }

    /// First image, used for cart and order thumbnails.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Case-insensitive match on name, description and SKU.
    #[must_use]
    pub fn matches(&self, needle_lowercase: &str) -> bool {
        self.name.to_lowercase().contains(needle_lowercase)
            || self.description.to_lowercase().contains(needle_lowercase)
            || self
                .sku
                .as_deref()
                .is_some_and(|sku| sku.to_lowercase().contains(needle_lowercase))
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: Option<u32>,
    pub category: CategoryId,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub featured: bool,
}

/// Partial update of a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    /// `Some(None)` stops tracking stock.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub stock: Option<Option<u32>>,
    pub category: Option<CategoryId>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub sku: Option<Option<String>>,
    pub popular: Option<bool>,
    pub featured: Option<bool>,
}

impl ProductUpdate {
    /// Apply the present fields to `product`.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(sku) = self.sku {
            product.sku = sku;
        }
        if let Some(popular) = self.popular {
            product.popular = popular;
        }
        if let Some(featured) = self.featured {
            product.featured = featured;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;

    /// A product in `category` with the given price in cents and stock.
    pub fn product(id: &str, category: &str, cents: u32, stock: Option<u32>) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Money::from_cents(cents),
            stock,
            category: CategoryId::new(category),
            images: vec![format!("/img/{id}.jpg")],
            sku: None,
            popular: false,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_untracked_stock_always_supplies() {
        let p = product("p", "roses", 100, None);
        assert!(!p.tracks_stock());
        assert!(p.can_supply(10_000));
    }

    #[test]
    fn test_tracked_stock_ceiling() {
        let p = product("p", "roses", 100, Some(2));
        assert!(p.can_supply(2));
        assert!(!p.can_supply(3));
    }

    #[test]
    fn test_update_can_stop_tracking_stock() {
        let mut p = product("p", "roses", 100, Some(2));
        let update: ProductUpdate = serde_json::from_str(r#"{"stock": null}"#).unwrap();
        update.apply_to(&mut p);
        assert_eq!(p.stock, None);

        let mut q = product("q", "roses", 100, Some(2));
        let untouched: ProductUpdate = serde_json::from_str(r#"{"name": "Pivoine"}"#).unwrap();
        untouched.apply_to(&mut q);
        assert_eq!(q.stock, Some(2));
        assert_eq!(q.name, "Pivoine");
    }
}
