//! Back-office route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin):
//! anonymous requests get 401, other roles 403. Mutations are written to the
//! audit log with the acting admin.
//!
//! ```text
//! GET/POST       /api/admin/categories
//! PUT/DELETE     /api/admin/categories/{id}          (?reassign=true)
//! GET/POST       /api/admin/products
//! PUT/DELETE     /api/admin/products/{id}
//! PUT            /api/admin/products/{id}/stock
//! GET            /api/admin/orders                   (?status=)
//! GET            /api/admin/orders/{id}
//! PUT            /api/admin/orders/{id}/status
//! GET/POST       /api/admin/posts                    (?status=)
//! PUT/DELETE     /api/admin/posts/{id}
//! POST           /api/admin/posts/{id}/schedule
//! POST           /api/admin/posts/publish-due
//! GET            /api/admin/comments                 (pending)
//! POST           /api/admin/comments/{id}/approve
//! DELETE         /api/admin/comments/{id}
//! GET            /api/admin/newsletter
//! DELETE         /api/admin/newsletter/{id}
//! GET            /api/admin/users
//! PUT            /api/admin/users/{id}/role
//! DELETE         /api/admin/users/{id}
//! GET            /api/admin/audit                    (?limit=)
//! GET            /api/admin/quotes
//! PUT            /api/admin/quotes/{id}/status
//! ```

pub mod catalog;
pub mod content;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use serde_json::Value;

use crate::models::user::User;
use crate::services::audit::AuditService;
use crate::state::AppState;

/// Create the back-office routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::add_category),
        )
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route(
            "/products",
            get(catalog::list_products).post(catalog::add_product),
        )
        .route(
            "/products/{id}",
            put(catalog::update_product).delete(catalog::delete_product),
        )
        .route("/products/{id}/stock", put(catalog::update_stock))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::show_order))
        .route("/orders/{id}/status", put(orders::update_order_status))
        .route("/quotes", get(orders::list_quotes))
        .route("/quotes/{id}/status", put(orders::update_quote_status))
        .route("/posts", get(content::list_posts).post(content::create_post))
        .route("/posts/publish-due", post(content::publish_due))
        .route(
            "/posts/{id}",
            put(content::update_post).delete(content::delete_post),
        )
        .route("/posts/{id}/schedule", post(content::schedule_post))
        .route("/comments", get(content::pending_comments))
        .route("/comments/{id}", delete(content::delete_comment))
        .route("/comments/{id}/approve", post(content::approve_comment))
        .route("/newsletter", get(content::list_subscribers))
        .route("/newsletter/{id}", delete(content::remove_subscriber))
        .route("/users", get(users::list_users))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/role", put(users::set_role))
        .route("/audit", get(users::audit_log))
}

/// Record an admin mutation. Failures are logged, never surfaced.
async fn audit(
    state: &AppState,
    admin: &User,
    action: &str,
    entity: &str,
    entity_id: &str,
    details: Value,
) {
    AuditService::new(state.store())
        .record_or_warn(Some(&admin.id), action, entity, entity_id, details)
        .await;
}
