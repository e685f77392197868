//! Quote requests.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use chezflora_core::{Money, QuoteId, QuoteStatus, UnknownStatus, UserId};

use crate::db::products::ProductRepository;
use crate::db::quotes::QuoteRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::order::StatusChange;
use crate::models::quote::{Quote, QuoteItem, QuoteRequest};

/// Errors that can occur during quote operations.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("a quote needs at least one item and a message")]
    EmptyRequest,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("product {0} not found")]
    ProductNotFound(String),

    #[error("cannot move quote from {from} to {to}")]
    InvalidTransition { from: QuoteStatus, to: QuoteStatus },

    #[error("a quoted price is required")]
    MissingPrice,

    #[error(transparent)]
    InvalidStatus(#[from] UnknownStatus),
}

/// Quote service over an injected store.
pub struct QuoteService<'a, S> {
    quotes: QuoteRepository<'a, S>,
    products: ProductRepository<'a, S>,
}

impl<'a, S: KvStore> QuoteService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            quotes: QuoteRepository::new(store),
            products: ProductRepository::new(store),
        }
    }

    /// Ask for a quote. Item names are filled from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::EmptyRequest`, `QuoteError::InvalidQuantity` or
    /// `QuoteError::ProductNotFound`.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn request_quote(
        &self,
        user_id: &UserId,
        request: QuoteRequest,
    ) -> Result<Quote, QuoteError> {
        let message = request.message.trim().to_owned();
        if request.items.is_empty() || message.is_empty() {
            return Err(QuoteError::EmptyRequest);
        }

        let products = self.products.list().await?;
        let items = request
            .items
            .into_iter()
            .map(|item| {
                if item.quantity == 0 {
                    return Err(QuoteError::InvalidQuantity);
                }
                let product = products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .ok_or_else(|| QuoteError::ProductNotFound(item.product_id.to_string()))?;
                Ok(QuoteItem {
                    name: product.name.clone(),
                    ..item
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let quote = Quote {
            id: QuoteId::generate(),
            user_id: user_id.clone(),
            items,
            message,
            event_date: request.event_date,
            status: QuoteStatus::Pending,
            quoted_price: None,
            status_history: vec![StatusChange {
                status: QuoteStatus::Pending,
                date: now,
                comment: None,
            }],
            created_at: now,
            updated_at: now,
        };
        self.quotes.insert(&quote).await?;
        info!(quote_id = %quote.id, "Quote requested");
        Ok(quote)
    }

    /// The user's quotes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::Repository` if the store fails.
    pub async fn list_quotes(&self, user_id: &UserId) -> Result<Vec<Quote>, QuoteError> {
        let mut quotes = self.quotes.list_for_user(user_id).await?;
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotes)
    }

    /// Every quote, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::Repository` if the store fails.
    pub async fn list_all_quotes(&self) -> Result<Vec<Quote>, QuoteError> {
        let mut quotes = self.quotes.list_all().await?;
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotes)
    }

    /// Move a quote along its lifecycle.
    ///
    /// Moving to `quoted` requires a price.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::InvalidTransition` or `QuoteError::MissingPrice`.
    #[instrument(skip(self, comment), fields(quote_id = %id, status = %status))]
    pub async fn update_quote_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
        comment: Option<String>,
        quoted_price: Option<Money>,
    ) -> Result<Option<Quote>, QuoteError> {
        if status == QuoteStatus::Quoted && quoted_price.is_none() {
            return Err(QuoteError::MissingPrice);
        }

        self.quotes
            .mutate_quote(id, |quote| {
                if !quote.status.can_transition_to(status) {
                    return Err(QuoteError::InvalidTransition {
                        from: quote.status,
                        to: status,
                    });
                }
                let now = Utc::now();
                quote.status = status;
                if quoted_price.is_some() {
                    quote.quoted_price = quoted_price;
                }
                quote.status_history.push(StatusChange {
                    status,
                    date: now,
                    comment: comment.clone(),
                });
                quote.updated_at = now;
                Ok(quote.clone())
            })
            .await
    }
}
