//! Quote requests for events and large orders.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::{Money, ProductId, QuoteId, QuoteStatus, UserId};

use super::order::StatusChange;

/// A customer's request for a custom price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub user_id: UserId,
    pub items: Vec<QuoteItem>,
    pub message: String,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    pub status: QuoteStatus,
    #[serde(default)]
    pub quoted_price: Option<Money>,
    pub status_history: Vec<StatusChange<QuoteStatus>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product and quantity the customer is asking about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub product_id: ProductId,
    /// Filled from the catalog when the quote is created.
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
}

/// Input for a quote request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub items: Vec<QuoteItem>,
    pub message: String,
    pub event_date: Option<NaiveDate>,
}

/// Admin decision on a quote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteStatusUpdate {
    pub status: String,
    pub comment: Option<String>,
    pub quoted_price: Option<Money>,
}
