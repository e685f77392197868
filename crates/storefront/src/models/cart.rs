//! Shopping cart lines and summaries.

use serde::{Deserialize, Serialize};

use chezflora_core::{Money, ProductId, UserId};

use super::product::Product;

/// One line of a cart: a product snapshot and a quantity of at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// Whose cart an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "userId")]
pub enum CartScope {
    /// Durable cart of a signed-in user.
    User(UserId),
    /// Session cart of an anonymous visitor.
    Guest,
}

/// Cart contents with derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    /// Sum of quantities across lines.
    pub item_count: u32,
    pub subtotal: Money,
}

impl CartSummary {
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self {
            item_count: item_count(&items),
            subtotal: subtotal(&items),
            items,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Broadcast after every cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEvent {
    pub scope: CartScope,
    pub item_count: u32,
}

/// Total number of units in `items`.
#[must_use]
pub fn item_count(items: &[CartItem]) -> u32 {
    items.iter().fold(0, |sum, item| sum.saturating_add(item.quantity))
}

/// Sum of line totals in `items`.
#[must_use]
pub fn subtotal(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

/// Request body for adding a product to a cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Request body for setting a line's quantity. Zero or less removes it.
#[derive(Debug, Clone, Deserialize)]
pub struct SetQuantity {
    pub quantity: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::fixtures::product;

    #[test]
    fn test_summary_totals() {
        let items = vec![
            CartItem {
                product: product("a", "roses", 1250, Some(5)),
                quantity: 2,
            },
            CartItem {
                product: product("b", "roses", 500, None),
                quantity: 3,
            },
        ];
        let summary = CartSummary::from_items(items);
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.subtotal, Money::from_cents(4000));
    }

    #[test]
    fn test_add_to_cart_defaults_to_one() {
        let body: AddToCart = serde_json::from_str(r#"{"productId": "rose-rouge"}"#).unwrap();
        assert_eq!(body.quantity, 1);
    }
}
