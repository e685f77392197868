//! Account administration and the audit log.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use chezflora_core::{Role, UserId};

use super::audit;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::audit::AuditEntry;
use crate::models::user::UserProfile;
use crate::routes::{ApiResponse, ApiResult};
use crate::services::audit::AuditService;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Entries returned by the audit endpoint when no limit is given.
const DEFAULT_AUDIT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// GET /api/admin/users
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<UserProfile>> {
    let users = AuthService::new(state.store()).list_users().await?;
    Ok(ApiResponse::ok(users.iter().map(UserProfile::from).collect()))
}

/// PUT /api/admin/users/{id}/role
///
/// Admins cannot change their own role, so the shop always keeps one.
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown user, (400) for the caller's own account.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<RoleUpdate>,
) -> ApiResult<UserProfile> {
    if id == admin.id {
        return Err(AppError::BadRequest("You cannot change your own role".to_string()));
    }
    let user = AuthService::new(state.store())
        .set_role(&id, body.role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    audit(
        &state,
        &admin,
        "set_role",
        "user",
        id.as_str(),
        json!({ "role": body.role }),
    )
    .await;
    Ok(ApiResponse::with_message("Role updated", UserProfile::from(&user)))
}

/// DELETE /api/admin/users/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown user, (400) for the caller's own account.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> ApiResult<()> {
    if id == admin.id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }
    if !AuthService::new(state.store()).delete_user(&id).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }
    audit(&state, &admin, "delete", "user", id.as_str(), json!({})).await;
    Ok(ApiResponse::with_message("User deleted", ()))
}

/// GET /api/admin/audit?limit=
///
/// Most recent entries first.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn audit_log(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Ok(ApiResponse::ok(
        AuditService::new(state.store()).recent(limit).await?,
    ))
}
