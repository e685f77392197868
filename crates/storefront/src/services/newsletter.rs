//! Newsletter subscriptions.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use chezflora_core::{Email, EmailError, SubscriberId};

use crate::db::newsletter::SubscriberRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::newsletter::Subscriber;

/// Errors that can occur during newsletter operations.
#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    Subscribed(Subscriber),
    AlreadySubscribed,
}

/// Newsletter service.
pub struct NewsletterService<'a, S> {
    subscribers: SubscriberRepository<'a, S>,
}

impl<'a, S: KvStore> NewsletterService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            subscribers: SubscriberRepository::new(store),
        }
    }

    /// Subscribe an address. Addresses compare case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::InvalidEmail` for a malformed address.
    #[instrument(skip(self, email))]
    pub async fn subscribe(&self, email: &str) -> Result<Subscription, NewsletterError> {
        let email = Email::parse(email)?;
        let subscription = self
            .subscribers
            .mutate(|subscribers| {
                if subscribers.iter().any(|s| s.email == email) {
                    return Ok::<_, NewsletterError>(Subscription::AlreadySubscribed);
                }
                let subscriber = Subscriber {
                    id: SubscriberId::generate(),
                    email: email.clone(),
                    subscribed_at: Utc::now(),
                };
                subscribers.push(subscriber.clone());
                Ok(Subscription::Subscribed(subscriber))
            })
            .await?;

        if matches!(subscription, Subscription::Subscribed(_)) {
            info!(domain = email.domain(), "Newsletter subscription added");
        }
        Ok(subscription)
    }

    /// Unsubscribe an address.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was subscribed.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::InvalidEmail` for a malformed address.
    #[instrument(skip(self, email))]
    pub async fn unsubscribe(&self, email: &str) -> Result<bool, NewsletterError> {
        let email = Email::parse(email)?;
        self.subscribers
            .mutate(|subscribers| {
                let before = subscribers.len();
                subscribers.retain(|s| s.email != email);
                Ok(subscribers.len() != before)
            })
            .await
    }

    /// Every subscriber, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::Repository` if the store fails.
    pub async fn list_subscribers(&self) -> Result<Vec<Subscriber>, NewsletterError> {
        Ok(self.subscribers.list().await?)
    }

    /// Remove a subscriber by id.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::Repository` if the store fails.
    pub async fn remove_subscriber(&self, id: &SubscriberId) -> Result<bool, NewsletterError> {
        self.subscribers
            .mutate(|subscribers| {
                let before = subscribers.len();
                subscribers.retain(|s| &s.id != id);
                Ok(subscribers.len() != before)
            })
            .await
    }
}
