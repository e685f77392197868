//! Account route handlers: orders, addresses and quotes of the signed-in user.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use chezflora_core::{AddressId, AddressType, OrderId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::address::{Address, AddressUpdate, NewAddress};
use crate::models::order::{CheckoutRequest, Order};
use crate::models::quote::{Quote, QuoteRequest};
use crate::routes::{ApiResponse, ApiResult, created};
use crate::services::addresses::AddressService;
use crate::services::orders::OrderService;
use crate::services::quotes::QuoteService;
use crate::state::AppState;

fn orders(state: &AppState) -> OrderService<'_, crate::db::StoreBackend> {
    OrderService::new(state.store(), state.config().shipping).with_cart_events(state.cart_events())
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/account/orders
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<Vec<Order>> {
    Ok(ApiResponse::ok(orders(&state).list_orders(&user.id).await?))
}

/// Place an order from the cart.
///
/// POST /api/account/orders
///
/// # Errors
///
/// Returns `AppError` for an empty cart, a missing address, or short stock.
#[instrument(skip(state, user, checkout), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(checkout): Json<CheckoutRequest>,
) -> Result<(StatusCode, ApiResponse<Order>)> {
    let order = orders(&state).create_order(&user.id, checkout).await?;
    Ok(created("Order placed", order))
}

/// GET /api/account/orders/{id}
///
/// # Errors
///
/// Returns `AppError` (404) if the user has no such order.
pub async fn show_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> ApiResult<Order> {
    orders(&state)
        .get_order(&user.id, &id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

/// Optional body of a cancellation.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// POST /api/account/orders/{id}/cancel
///
/// # Errors
///
/// Returns `AppError` (404) if the user has no such order, (409) once it shipped.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    body: Option<Json<CancelRequest>>,
) -> ApiResult<Order> {
    let reason = body.and_then(|Json(body)| body.reason);
    orders(&state)
        .cancel_order(&user.id, &id, reason)
        .await?
        .map(|order| ApiResponse::with_message("Order cancelled", order))
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
}

// =============================================================================
// Addresses
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AddressQuery {
    #[serde(rename = "type")]
    pub address_type: Option<AddressType>,
}

/// GET /api/account/addresses?type=
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<AddressQuery>,
) -> ApiResult<Vec<Address>> {
    let addresses = AddressService::new(state.store())
        .list_addresses(&user.id, query.address_type)
        .await?;
    Ok(ApiResponse::ok(addresses))
}

/// POST /api/account/addresses
///
/// # Errors
///
/// Returns `AppError` (400) when a required field is empty.
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(data): Json<NewAddress>,
) -> Result<(StatusCode, ApiResponse<Address>)> {
    let address = AddressService::new(state.store())
        .add_address(&user.id, data)
        .await?;
    Ok(created("Address added", address))
}

/// PUT /api/account/addresses/{id}
///
/// # Errors
///
/// Returns `AppError` (404) if the user has no such address.
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(data): Json<AddressUpdate>,
) -> ApiResult<Address> {
    AddressService::new(state.store())
        .update_address(&user.id, &id, data)
        .await?
        .map(|address| ApiResponse::with_message("Address updated", address))
        .ok_or_else(|| AppError::NotFound(format!("Address {id} not found")))
}

/// DELETE /api/account/addresses/{id}
///
/// # Errors
///
/// Returns `AppError` (404) if the user has no such address.
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> ApiResult<()> {
    if AddressService::new(state.store())
        .delete_address(&user.id, &id)
        .await?
    {
        Ok(ApiResponse::with_message("Address deleted", ()))
    } else {
        Err(AppError::NotFound(format!("Address {id} not found")))
    }
}

/// POST /api/account/addresses/{id}/default
///
/// # Errors
///
/// Returns `AppError` (404) if the user has no such address.
pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> ApiResult<Address> {
    AddressService::new(state.store())
        .set_default_address(&user.id, &id)
        .await?
        .map(|address| ApiResponse::with_message("Default address set", address))
        .ok_or_else(|| AppError::NotFound(format!("Address {id} not found")))
}

// =============================================================================
// Quotes
// =============================================================================

/// GET /api/account/quotes
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_quotes(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<Vec<Quote>> {
    Ok(ApiResponse::ok(
        QuoteService::new(state.store()).list_quotes(&user.id).await?,
    ))
}

/// POST /api/account/quotes
///
/// # Errors
///
/// Returns `AppError` (400) for an empty request, (404) for unknown products.
pub async fn request_quote(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<QuoteRequest>,
) -> Result<(StatusCode, ApiResponse<Quote>)> {
    let quote = QuoteService::new(state.store())
        .request_quote(&user.id, request)
        .await?;
    Ok(created("Quote requested", quote))
}
