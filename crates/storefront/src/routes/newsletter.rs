//! Newsletter route handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::Result;
use crate::models::newsletter::{Subscriber, SubscriptionRequest};
use crate::routes::{ApiResponse, created};
use crate::services::newsletter::{NewsletterService, Subscription};
use crate::state::AppState;

/// POST /api/newsletter/subscribe
///
/// Subscribing twice is not an error; the second call reports `data: null`.
///
/// # Errors
///
/// Returns `AppError` (400) for a malformed address.
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscriptionRequest>,
) -> Result<(StatusCode, ApiResponse<Option<Subscriber>>)> {
    match NewsletterService::new(state.store()).subscribe(&body.email).await? {
        Subscription::Subscribed(subscriber) => Ok(created("Subscribed", Some(subscriber))),
        Subscription::AlreadySubscribed => Ok((
            StatusCode::OK,
            ApiResponse::with_message("Already subscribed", None),
        )),
    }
}

/// POST /api/newsletter/unsubscribe
///
/// Always succeeds for a well-formed address so the endpoint does not reveal
/// who is subscribed.
///
/// # Errors
///
/// Returns `AppError` (400) for a malformed address.
#[instrument(skip_all)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscriptionRequest>,
) -> Result<ApiResponse<()>> {
    let removed = NewsletterService::new(state.store())
        .unsubscribe(&body.email)
        .await?;
    tracing::debug!(removed, "Newsletter unsubscribe");
    Ok(ApiResponse::with_message("Unsubscribed", ()))
}
