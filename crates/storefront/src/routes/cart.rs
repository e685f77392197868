//! Cart route handlers.
//!
//! The same handlers serve the signed-in user's cart under `/api/cart` and
//! the visitor's session cart under `/api/guest/cart`; the [`CartSelector`]
//! extractor decides which one a request addresses.

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    routing::{get, post, put},
};
use tower_sessions::Session;
use tracing::instrument;

use chezflora_core::ProductId;

use crate::db::SessionKv;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCart, CartScope, CartSummary, SetQuantity};
use crate::routes::{ApiResponse, ApiResult};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Resolves which cart a request operates on.
pub trait CartSelector: FromRequestParts<AppState> + Send + 'static {
    fn scope(&self) -> CartScope;
}

/// The signed-in user's cart. Rejects anonymous requests with 401.
pub struct UserCart(CartScope);

impl FromRequestParts<AppState> for UserCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        Ok(Self(CartScope::User(user.id)))
    }
}

impl CartSelector for UserCart {
    fn scope(&self) -> CartScope {
        self.0.clone()
    }
}

/// The anonymous visitor's session cart.
pub struct GuestCart;

impl FromRequestParts<AppState> for GuestCart {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(_parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self)
    }
}

impl CartSelector for GuestCart {
    fn scope(&self) -> CartScope {
        CartScope::Guest
    }
}

/// Create the cart routes router for one kind of cart.
pub fn routes<C: CartSelector>() -> Router<AppState> {
    Router::new()
        .route("/", get(show::<C>).delete(clear::<C>))
        .route("/items", post(add_item::<C>))
        .route("/items/{id}", put(update_item::<C>).delete(remove_item::<C>))
}

/// Cart contents with item count and subtotal.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn show<C: CartSelector>(
    State(state): State<AppState>,
    session: Session,
    cart: C,
) -> ApiResult<CartSummary> {
    let guest = SessionKv::new(session);
    let summary = CartService::new(state.store(), &guest, state.cart_events())
        .summary(&cart.scope())
        .await?;
    Ok(ApiResponse::ok(summary))
}

/// Add a product, merging with an existing line.
///
/// # Errors
///
/// Returns `AppError` (404) for unknown products, (409) with the available
/// quantity when stock is short.
#[instrument(skip(state, session, cart))]
pub async fn add_item<C: CartSelector>(
    State(state): State<AppState>,
    session: Session,
    cart: C,
    Json(body): Json<AddToCart>,
) -> ApiResult<CartSummary> {
    let guest = SessionKv::new(session);
    let summary = CartService::new(state.store(), &guest, state.cart_events())
        .add_to_cart(&cart.scope(), &body.product_id, body.quantity)
        .await?;
    Ok(ApiResponse::with_message("Added to cart", summary))
}

/// Set a line's quantity. Zero or less removes the line.
///
/// # Errors
///
/// Returns `AppError` (409) when the quantity exceeds stock.
pub async fn update_item<C: CartSelector>(
    State(state): State<AppState>,
    session: Session,
    cart: C,
    Path(product_id): Path<ProductId>,
    Json(body): Json<SetQuantity>,
) -> ApiResult<CartSummary> {
    let guest = SessionKv::new(session);
    let summary = CartService::new(state.store(), &guest, state.cart_events())
        .update_cart_item_quantity(&cart.scope(), &product_id, body.quantity)
        .await?;
    Ok(ApiResponse::with_message("Cart updated", summary))
}

/// Remove a line.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn remove_item<C: CartSelector>(
    State(state): State<AppState>,
    session: Session,
    cart: C,
    Path(product_id): Path<ProductId>,
) -> ApiResult<CartSummary> {
    let guest = SessionKv::new(session);
    let summary = CartService::new(state.store(), &guest, state.cart_events())
        .remove_from_cart(&cart.scope(), &product_id)
        .await?;
    Ok(ApiResponse::with_message("Removed from cart", summary))
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn clear<C: CartSelector>(
    State(state): State<AppState>,
    session: Session,
    cart: C,
) -> ApiResult<CartSummary> {
    let guest = SessionKv::new(session);
    let service = CartService::new(state.store(), &guest, state.cart_events());
    let scope = cart.scope();
    service.clear_cart(&scope).await?;
    let summary = service.summary(&scope).await?;
    Ok(ApiResponse::with_message("Cart cleared", summary))
}
