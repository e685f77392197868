//! Authentication route handlers.
//!
//! Email and password accounts. Logging in also moves the visitor's guest
//! cart into their account cart.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::db::SessionKv;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::cart::{CartScope, CartSummary};
use crate::models::session::CurrentUser;
use crate::models::user::{User, UserProfile};
use crate::routes::{ApiResponse, ApiResult, created};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session payload returned after register and login.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: UserProfile,
    pub cart: CartSummary,
}

/// Register a customer account and log it in.
///
/// POST /auth/register
///
/// # Errors
///
/// Returns `AppError` for invalid input or an already registered email.
#[instrument(skip(state, session, registration))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(registration): Json<Registration>,
) -> crate::error::Result<(StatusCode, ApiResponse<SessionView>)> {
    let user = AuthService::new(state.store()).register(registration).await?;
    let view = start_session(&state, &session, &user).await?;
    Ok(created("Account created", view))
}

/// Log in with email and password.
///
/// POST /auth/login
///
/// # Errors
///
/// Returns `AppError` (401) for unknown emails and wrong passwords alike.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> ApiResult<SessionView> {
    let user = AuthService::new(state.store())
        .login(&body.email, &body.password)
        .await?;
    let view = start_session(&state, &session, &user).await?;
    Ok(ApiResponse::with_message("Logged in", view))
}

/// Log out and discard the session, guest cart included.
///
/// POST /auth/logout
///
/// # Errors
///
/// Returns `AppError` if the session store fails.
pub async fn logout(session: Session) -> ApiResult<()> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(ApiResponse::with_message("Logged out", ()))
}

/// The logged-in user's profile.
///
/// GET /auth/me
///
/// # Errors
///
/// Returns `AppError` (401) if nobody is logged in or the account is gone.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> ApiResult<UserProfile> {
    match AuthService::new(state.store()).get_user(&current.id).await {
        Ok(user) => Ok(ApiResponse::ok(UserProfile::from(&user))),
        Err(AuthError::UserNotFound) => {
            Err(AppError::Unauthorized("Account no longer exists".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Bind `user` to the session and merge the guest cart into theirs.
///
/// A failed merge does not fail the login: the guest lines stay in the
/// session and the account cart is returned as is.
async fn start_session(
    state: &AppState,
    session: &Session,
    user: &User,
) -> crate::error::Result<SessionView> {
    let current = CurrentUser {
        id: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let guest = SessionKv::new(session.clone());
    let carts = CartService::new(state.store(), &guest, state.cart_events());
    let cart = match carts.migrate_guest_cart(&user.id).await {
        Ok(cart) => cart,
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Guest cart merge failed");
            carts.summary(&CartScope::User(user.id.clone())).await?
        }
    };

    Ok(SessionView {
        user: UserProfile::from(user),
        cart,
    })
}
