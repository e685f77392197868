//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error is rendered with the same JSON envelope as successful
//! responses: `{"success": false, "message": "...", "data": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::addresses::AddressError;
use crate::services::auth::AuthError;
use crate::services::blog::BlogError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::newsletter::NewsletterError;
use crate::services::orders::OrderError;
use crate::services::quotes::QuoteError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Blog(#[from] BlogError),

    #[error(transparent)]
    Newsletter(#[from] NewsletterError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) | AuthError::MissingName => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::Repository(err) => repository_status(err),
                CatalogError::InvalidName
                | CatalogError::ParentNotFound(_)
                | CatalogError::CategoryNotFound(_)
                | CatalogError::CycleDetected { .. } => StatusCode::BAD_REQUEST,
                CatalogError::DuplicateCategory(_)
                | CatalogError::DuplicateProduct(_)
                | CatalogError::HasProducts { .. } => StatusCode::CONFLICT,
            },
            Self::Cart(err) => match err {
                CartError::Repository(err) => repository_status(err),
                CartError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
            },
            Self::Address(err) => match err {
                AddressError::Repository(err) => repository_status(err),
                AddressError::MissingField(_) => StatusCode::BAD_REQUEST,
            },
            Self::Order(err) => match err {
                OrderError::Repository(err) => repository_status(err),
                OrderError::EmptyCart
                | OrderError::MissingAddress(_)
                | OrderError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
                OrderError::AddressNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::InsufficientStock { .. }
                | OrderError::ProductUnavailable(_)
                | OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
            },
            Self::Blog(err) => match err {
                BlogError::Repository(err) => repository_status(err),
                BlogError::PostNotFound(_) | BlogError::NotPublished => StatusCode::NOT_FOUND,
                BlogError::DuplicateSlug(_) => StatusCode::CONFLICT,
                BlogError::InvalidTitle
                | BlogError::ScheduleRequired
                | BlogError::ScheduleInPast
                | BlogError::EmptyComment => StatusCode::BAD_REQUEST,
            },
            Self::Newsletter(err) => match err {
                NewsletterError::Repository(err) => repository_status(err),
                NewsletterError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            },
            Self::Quote(err) => match err {
                QuoteError::Repository(err) => repository_status(err),
                QuoteError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                QuoteError::InvalidTransition { .. } => StatusCode::CONFLICT,
                QuoteError::EmptyRequest
                | QuoteError::InvalidQuantity
                | QuoteError::MissingPrice
                | QuoteError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured details for the client, if any.
    fn data(&self) -> Value {
        match self {
            Self::Cart(CartError::InsufficientStock { product, available })
            | Self::Order(OrderError::InsufficientStock { product, available }) => {
                json!({ "product": product, "available": available })
            }
            _ => Value::Null,
        }
    }

    /// Client-facing message. Server-side details are never exposed.
    fn message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                "Invalid credentials".to_string()
            }
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_string()
            }
            Self::Auth(AuthError::WeakPassword(msg)) => msg.clone(),
            Self::Database(RepositoryError::Conflict(_)) => {
                "The data changed while saving, please retry".to_string()
            }
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

/// Version conflicts that survived the retry loop are the client's to retry.
fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = json!({
            "success": false,
            "message": self.message(status),
            "data": self.data(),
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use chezflora_core::{CategoryId, OrderStatus};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body(err: AppError) -> Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("orders".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        let cycle = CatalogError::CycleDetected {
            category: CategoryId::new("a"),
            parent: CategoryId::new("b"),
        };
        assert_eq!(get_status(cycle.into()), StatusCode::BAD_REQUEST);

        let transition = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert_eq!(get_status(transition.into()), StatusCode::CONFLICT);
        assert_eq!(get_status(AuthError::UserAlreadyExists.into()), StatusCode::CONFLICT);
        assert_eq!(get_status(OrderError::EmptyCart.into()), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_insufficient_stock_carries_available() {
        let err = CartError::InsufficientStock {
            product: "Bouquet".into(),
            available: 2,
        };
        let body = body(err.into()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["available"], 2);
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption("users: bad json".into()));
        let body = body(err).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body["data"].is_null());
    }
}
