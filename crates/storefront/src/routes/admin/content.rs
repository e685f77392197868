//! Blog, comment moderation and newsletter administration.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use chezflora_core::{CommentId, PostId, PostStatus, SubscriberId};

use super::audit;
use super::orders::StatusFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::blog::{BlogPost, Comment, NewPost, PostUpdate, ScheduleRequest};
use crate::models::newsletter::Subscriber;
use crate::routes::{ApiResponse, ApiResult, created};
use crate::services::blog::BlogService;
use crate::services::newsletter::NewsletterService;
use crate::state::AppState;

// =============================================================================
// Posts
// =============================================================================

/// GET /api/admin/posts?status=
///
/// # Errors
///
/// Returns `AppError` (400) for an unknown status.
pub async fn list_posts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Vec<BlogPost>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<PostStatus>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(ApiResponse::ok(
        BlogService::new(state.store()).list_posts(status).await?,
    ))
}

/// POST /api/admin/posts
///
/// # Errors
///
/// Returns `AppError` for an empty title or a slug already in use.
#[instrument(skip_all)]
pub async fn create_post(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(data): Json<NewPost>,
) -> Result<(StatusCode, ApiResponse<BlogPost>)> {
    let post = BlogService::new(state.store()).create_post(data).await?;
    audit(
        &state,
        &admin,
        "create",
        "post",
        post.id.as_str(),
        json!({ "title": post.title, "status": post.status }),
    )
    .await;
    Ok(created("Post created", post))
}

/// PUT /api/admin/posts/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown post, (400) when trying to set the
/// `scheduled` status directly.
#[instrument(skip_all, fields(post_id = %id))]
pub async fn update_post(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PostId>,
    Json(data): Json<PostUpdate>,
) -> ApiResult<BlogPost> {
    let post = BlogService::new(state.store())
        .update_post(&id, data)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {id} not found")))?;
    audit(
        &state,
        &admin,
        "update",
        "post",
        id.as_str(),
        json!({ "status": post.status }),
    )
    .await;
    Ok(ApiResponse::with_message("Post updated", post))
}

/// DELETE /api/admin/posts/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown post.
#[instrument(skip_all, fields(post_id = %id))]
pub async fn delete_post(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PostId>,
) -> ApiResult<()> {
    if !BlogService::new(state.store()).delete_post(&id).await? {
        return Err(AppError::NotFound(format!("Post {id} not found")));
    }
    audit(&state, &admin, "delete", "post", id.as_str(), json!({})).await;
    Ok(ApiResponse::with_message("Post deleted", ()))
}

/// POST /api/admin/posts/{id}/schedule
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown post, (400) for a date in the past.
#[instrument(skip_all, fields(post_id = %id))]
pub async fn schedule_post(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PostId>,
    Json(body): Json<ScheduleRequest>,
) -> ApiResult<BlogPost> {
    let post = BlogService::new(state.store())
        .schedule_post(&id, body.scheduled_date, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {id} not found")))?;
    audit(
        &state,
        &admin,
        "schedule",
        "post",
        id.as_str(),
        json!({ "scheduledDate": body.scheduled_date }),
    )
    .await;
    Ok(ApiResponse::with_message("Post scheduled", post))
}

/// Publish every scheduled post that is due now, without waiting for the
/// background publisher.
///
/// POST /api/admin/posts/publish-due
///
/// # Errors
///
/// Returns `AppError` if the store fails.
#[instrument(skip_all)]
pub async fn publish_due(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> ApiResult<Vec<PostId>> {
    let published = BlogService::new(state.store())
        .publish_scheduled_posts(Utc::now())
        .await?;
    for id in &published {
        audit(&state, &admin, "publish", "post", id.as_str(), json!({ "scheduled": true })).await;
    }
    let message = format!("{} post(s) published", published.len());
    Ok(ApiResponse::with_message(message, published))
}

// =============================================================================
// Comments
// =============================================================================

/// GET /api/admin/comments
///
/// Comments awaiting moderation.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn pending_comments(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Comment>> {
    Ok(ApiResponse::ok(
        BlogService::new(state.store()).list_pending_comments().await?,
    ))
}

/// POST /api/admin/comments/{id}/approve
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown comment.
pub async fn approve_comment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CommentId>,
) -> ApiResult<Comment> {
    let comment = BlogService::new(state.store())
        .approve_comment(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {id} not found")))?;
    audit(
        &state,
        &admin,
        "approve",
        "comment",
        id.as_str(),
        json!({ "postId": comment.post_id }),
    )
    .await;
    Ok(ApiResponse::with_message("Comment approved", comment))
}

/// DELETE /api/admin/comments/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CommentId>,
) -> ApiResult<()> {
    if !BlogService::new(state.store()).delete_comment(&id).await? {
        return Err(AppError::NotFound(format!("Comment {id} not found")));
    }
    audit(&state, &admin, "delete", "comment", id.as_str(), json!({})).await;
    Ok(ApiResponse::with_message("Comment deleted", ()))
}

// =============================================================================
// Newsletter
// =============================================================================

/// GET /api/admin/newsletter
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_subscribers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Subscriber>> {
    Ok(ApiResponse::ok(
        NewsletterService::new(state.store()).list_subscribers().await?,
    ))
}

/// DELETE /api/admin/newsletter/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown subscriber.
pub async fn remove_subscriber(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<SubscriberId>,
) -> ApiResult<()> {
    if !NewsletterService::new(state.store()).remove_subscriber(&id).await? {
        return Err(AppError::NotFound(format!("Subscriber {id} not found")));
    }
    audit(&state, &admin, "delete", "subscriber", id.as_str(), json!({})).await;
    Ok(ApiResponse::with_message("Subscriber removed", ()))
}
