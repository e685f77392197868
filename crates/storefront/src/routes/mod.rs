//! HTTP route handlers for storefront.
//!
//! Every handler answers with the JSON envelope
//! `{"success": bool, "message": string, "data": any}`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (store reachable)
//!
//! # Auth
//! POST /auth/register                   - Create a customer account and log in
//! POST /auth/login                      - Log in (merges the guest cart)
//! POST /auth/logout                     - Log out
//! GET  /auth/me                         - Current user profile
//!
//! # Cart (signed-in user; same shapes under /api/guest/cart for visitors)
//! GET    /api/cart                      - Cart summary
//! POST   /api/cart/items                - Add a product
//! PUT    /api/cart/items/{id}           - Set a line's quantity (<= 0 removes)
//! DELETE /api/cart/items/{id}           - Remove a line
//! DELETE /api/cart                      - Empty the cart
//!
//! # Catalog
//! GET  /api/categories                  - All categories (?main=true for roots)
//! GET  /api/categories/{id}/children    - Direct children
//! GET  /api/categories/{id}/path        - Root-to-category path
//! GET  /api/products                    - ?category=&includeSubcategories=&q=
//! GET  /api/products/featured           - Featured products
//! GET  /api/products/popular            - Popular products
//! GET  /api/products/{id}               - Product detail
//!
//! # Account (requires auth)
//! GET/POST   /api/account/orders        - Order history / checkout
//! GET        /api/account/orders/{id}   - Order detail
//! POST       /api/account/orders/{id}/cancel
//! GET/POST   /api/account/addresses
//! PUT/DELETE /api/account/addresses/{id}
//! POST       /api/account/addresses/{id}/default
//! GET/POST   /api/account/quotes
//!
//! # Blog and newsletter
//! GET      /api/blog/posts                  - Published posts
//! GET      /api/blog/posts/{slug}           - Published post by slug
//! GET/POST /api/blog/posts/{id}/comments    - Approved comments / submit one
//! POST     /api/newsletter/subscribe
//! POST     /api/newsletter/unsubscribe
//!
//! # Back-office (requires the admin role)
//! /api/admin/...                        - See [`admin`]
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod catalog;
pub mod newsletter;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{Span, field, info_span};

use crate::db::KvStore;
use crate::middleware::{create_session_layer, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response with no particular message.
    pub fn ok(data: T) -> Self {
        Self::with_message("OK", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A `201 Created` response.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ApiResponse::with_message(message, data))
}

/// Handler result carrying the success envelope.
pub type ApiResult<T> = crate::error::Result<ApiResponse<T>>;

/// Build the complete application router.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/api/cart", cart::routes::<cart::UserCart>())
        .nest("/api/guest/cart", cart::routes::<cart::GuestCart>())
        .merge(catalog_routes())
        .nest("/api/account", account_routes())
        .nest("/api/blog", blog_routes())
        .nest("/api/newsletter", newsletter_routes())
        .nest("/api/admin", admin::routes())
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Span for one request; `request_id` is filled in by the request ID middleware.
fn request_span(request: &Request) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = field::Empty,
    )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the public catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(catalog::categories))
        .route("/api/categories/{id}/children", get(catalog::children))
        .route("/api/categories/{id}/path", get(catalog::path))
        .route("/api/products", get(catalog::products))
        .route("/api/products/featured", get(catalog::featured))
        .route("/api/products/popular", get(catalog::popular))
        .route("/api/products/{id}", get(catalog::product))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(account::list_orders).post(account::checkout),
        )
        .route("/orders/{id}", get(account::show_order))
        .route("/orders/{id}/cancel", post(account::cancel_order))
        .route(
            "/addresses",
            get(account::list_addresses).post(account::add_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route("/addresses/{id}/default", post(account::set_default_address))
        .route(
            "/quotes",
            get(account::list_quotes).post(account::request_quote),
        )
}

/// Create the blog routes router.
///
/// The `{post}` segment is a slug on the detail route and an id on the
/// comment routes.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(blog::list_posts))
        .route("/posts/{post}", get(blog::show_post))
        .route(
            "/posts/{post}/comments",
            get(blog::list_comments).post(blog::add_comment),
        )
}

/// Create the newsletter routes router.
pub fn newsletter_routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(newsletter::subscribe))
        .route("/unsubscribe", post(newsletter::unsubscribe))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().name(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use chezflora_core::{CategoryId, Money, ProductId};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::db::StoreBackend;
    use crate::models::product::NewProduct;
    use crate::services::catalog::CatalogService;

    fn state() -> AppState {
        AppState::new(StorefrontConfig::default(), StoreBackend::memory())
    }

    async fn seed_product(state: &AppState, id: &str, stock: Option<u32>) {
        CatalogService::new(state.store())
            .add_product(NewProduct {
                id: Some(ProductId::new(id)),
                name: "Bouquet champêtre".to_owned(),
                description: String::new(),
                price: Money::from_cents(2500),
                stock,
                category: CategoryId::uncategorized(),
                images: Vec::new(),
                sku: None,
                popular: false,
                featured: false,
            })
            .await
            .unwrap();
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state())
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_and_security_headers() {
        let response = app(state())
            .oneshot(
                Request::get("/health")
                    .header(crate::middleware::REQUEST_ID_HEADER, "edge-1234")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[crate::middleware::REQUEST_ID_HEADER], "edge-1234");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");

        let response = app(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = response.headers()[crate::middleware::REQUEST_ID_HEADER]
            .to_str()
            .unwrap();
        assert_eq!(generated.len(), 36);
    }

    #[tokio::test]
    async fn test_user_cart_requires_login() {
        let response = app(state())
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_admin_requires_login() {
        let response = app(state())
            .oneshot(Request::get("/api/admin/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_guest_cart_reports_available_stock() {
        let state = state();
        seed_product(&state, "bouquet", Some(2)).await;

        let response = app(state.clone())
            .oneshot(post_json(
                "/api/guest/cart/items",
                &json!({ "productId": "bouquet", "quantity": 2 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["itemCount"], 2);

        let response = app(state)
            .oneshot(post_json(
                "/api/guest/cart/items",
                &json!({ "productId": "bouquet", "quantity": 3 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["data"]["available"], 2);
    }

    #[tokio::test]
    async fn test_unknown_product_is_404_envelope() {
        let response = app(state())
            .oneshot(Request::get("/api/products/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_register_then_me() {
        let response = app(state())
            .oneshot(post_json(
                "/auth/register",
                &json!({
                    "email": "lea@example.fr",
                    "password": "Pivoine-2026",
                    "firstName": "Léa",
                    "lastName": "Martin",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        let body = json_body(response).await;
        assert_eq!(body["data"]["user"]["role"], "customer");
        assert_eq!(body["data"]["cart"]["itemCount"], 0);
    }
}
