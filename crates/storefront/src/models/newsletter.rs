//! Newsletter subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::{Email, SubscriberId};

/// A newsletter subscription. Emails are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub subscribed_at: DateTime<Utc>,
}

/// Request body for subscribe and unsubscribe.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRequest {
    pub email: String,
}
