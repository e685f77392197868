//! Orders and checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use chezflora_core::{AddressId, Money, OrderId, OrderStatus, ProductId, UserId};

use super::address::Address;
use super::product::Product;

/// A placed order.
///
/// Items and addresses are snapshots taken at checkout; later catalog or
/// address-book edits do not change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub status_history: Vec<StatusChange<OrderStatus>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Move to `status`, appending to the history.
    ///
    /// The caller is responsible for checking the transition is allowed.
    pub fn record_status(&mut self, status: OrderStatus, comment: Option<String>, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        self.status_history.push(StatusChange {
            status,
            date: at,
            comment,
        });
    }
}

/// A purchased line, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl OrderItem {
    /// Freeze `quantity` units of `product` at its current name and price.
    #[must_use]
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            image: product.primary_image().map(str::to_owned),
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// One entry of an append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange<S> {
    pub status: S,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    Paypal,
    BankTransfer,
}

/// Checkout request for the signed-in user's cart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Explicit shipping address; the default shipping address otherwise.
    pub shipping_address_id: Option<AddressId>,
    /// Explicit billing address; the default billing address, then the
    /// shipping address otherwise.
    pub billing_address_id: Option<AddressId>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Request body for an admin status change.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    pub comment: Option<String>,
}

/// Flat-rate shipping with an optional free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_rate: Money,
    /// Orders with a subtotal at or above this amount ship for free.
    pub free_over: Option<Money>,
}

impl ShippingPolicy {
    /// Shipping cost for an order with `subtotal`.
    #[must_use]
    pub fn cost_for(&self, subtotal: Money) -> Money {
        match self.free_over {
            Some(threshold) if subtotal >= threshold => Money::ZERO,
            _ => self.flat_rate,
        }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_rate: Money::from_cents(790),
            free_over: None,
        }
    }
}

/// Generate an order id of the form `ORD-<unix millis>-<6 base36 chars>`.
#[must_use]
pub fn generate_order_id(now: DateTime<Utc>) -> OrderId {
    use rand::Rng;

    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .filter_map(|_| ALPHABET.get(rng.random_range(0..ALPHABET.len())))
        .map(|&byte| char::from(byte))
        .collect();
    OrderId::new(format!("ORD-{}-{suffix}", now.timestamp_millis()))
}

/// Parse a money amount from configuration or request input.
///
/// # Errors
///
/// Returns a message if the input is not a non-negative decimal.
pub fn parse_money(input: &str) -> Result<Money, String> {
    let amount: Decimal = input
        .trim()
        .parse()
        .map_err(|e| format!("invalid amount {input:?}: {e}"))?;
    Money::new(amount).map_err(|e| e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_rate_shipping() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.cost_for(Money::from_cents(5000)), Money::from_cents(790));
    }

    #[test]
    fn test_free_shipping_threshold() {
        let policy = ShippingPolicy {
            flat_rate: Money::from_cents(790),
            free_over: Some(Money::from_cents(6000)),
        };
        assert_eq!(policy.cost_for(Money::from_cents(5999)), Money::from_cents(790));
        assert_eq!(policy.cost_for(Money::from_cents(6000)), Money::ZERO);
    }

    #[test]
    fn test_order_id_format() {
        let now = Utc::now();
        let id = generate_order_id(now);
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("7.90").unwrap(), Money::from_cents(790));
        assert!(parse_money("-1").is_err());
        assert!(parse_money("abc").is_err());
    }
}
