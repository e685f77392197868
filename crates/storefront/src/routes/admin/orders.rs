//! Order and quote administration.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use chezflora_core::{OrderId, OrderStatus, QuoteId, QuoteStatus};

use super::audit;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::order::{Order, StatusUpdate};
use crate::models::quote::{Quote, QuoteStatusUpdate};
use crate::routes::{ApiResponse, ApiResult};
use crate::services::orders::{OrderError, OrderService};
use crate::services::quotes::{QuoteError, QuoteService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// GET /api/admin/orders?status=
///
/// # Errors
///
/// Returns `AppError` (400) for an unknown status.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Vec<Order>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(OrderError::from)?;
    let orders = OrderService::new(state.store(), state.config().shipping)
        .list_all_orders(status)
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// GET /api/admin/orders/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown order.
pub async fn show_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> ApiResult<Order> {
    OrderService::new(state.store(), state.config().shipping)
        .find_order(&id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

/// PUT /api/admin/orders/{id}/status
///
/// Cancelling restores stock.
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown order, (409) for a transition the
/// lifecycle does not allow.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Order> {
    let status: OrderStatus = body.status.parse().map_err(OrderError::from)?;
    let order = OrderService::new(state.store(), state.config().shipping)
        .update_order_status(&id, status, body.comment.clone())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;
    audit(
        &state,
        &admin,
        "update_status",
        "order",
        id.as_str(),
        json!({ "status": status, "comment": body.comment }),
    )
    .await;
    Ok(ApiResponse::with_message("Order status updated", order))
}

/// GET /api/admin/quotes
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_quotes(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Quote>> {
    Ok(ApiResponse::ok(
        QuoteService::new(state.store()).list_all_quotes().await?,
    ))
}

/// PUT /api/admin/quotes/{id}/status
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown quote, (400) when `quoted` lacks a
/// price, (409) for a transition the lifecycle does not allow.
#[instrument(skip_all, fields(quote_id = %id))]
pub async fn update_quote_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<QuoteId>,
    Json(body): Json<QuoteStatusUpdate>,
) -> ApiResult<Quote> {
    let status: QuoteStatus = body.status.parse().map_err(QuoteError::from)?;
    let quote = QuoteService::new(state.store())
        .update_quote_status(&id, status, body.comment.clone(), body.quoted_price)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quote {id} not found")))?;
    audit(
        &state,
        &admin,
        "update_status",
        "quote",
        id.as_str(),
        json!({ "status": status, "quotedPrice": body.quoted_price }),
    )
    .await;
    Ok(ApiResponse::with_message("Quote updated", quote))
}
