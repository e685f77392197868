//! Public blog route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use chezflora_core::PostId;

use crate::error::{AppError, Result};
use crate::models::blog::{BlogPost, Comment, NewComment};
use crate::routes::{ApiResponse, ApiResult, created};
use crate::services::blog::BlogService;
use crate::state::AppState;

/// GET /api/blog/posts
///
/// Published posts, newest first.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Vec<BlogPost>> {
    Ok(ApiResponse::ok(
        BlogService::new(state.store()).list_published().await?,
    ))
}

/// GET /api/blog/posts/{slug}
///
/// Drafts and scheduled posts are reported as missing.
///
/// # Errors
///
/// Returns `AppError` (404) unless a published post has this slug.
pub async fn show_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<BlogPost> {
    BlogService::new(state.store())
        .get_post_by_slug(&slug)
        .await?
        .filter(BlogPost::is_published)
        .map(ApiResponse::ok)
        .ok_or_else(|| AppError::NotFound(format!("Post {slug} not found")))
}

/// GET /api/blog/posts/{id}/comments
///
/// Approved comments only.
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<PostId>,
) -> ApiResult<Vec<Comment>> {
    Ok(ApiResponse::ok(
        BlogService::new(state.store())
            .list_comments(&post_id, false)
            .await?,
    ))
}

/// POST /api/blog/posts/{id}/comments
///
/// The comment is held for moderation.
///
/// # Errors
///
/// Returns `AppError` (404) for unknown or unpublished posts, (400) for an
/// empty comment.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<PostId>,
    Json(data): Json<NewComment>,
) -> Result<(StatusCode, ApiResponse<Comment>)> {
    let comment = BlogService::new(state.store())
        .add_comment(&post_id, data)
        .await?;
    Ok(created("Comment submitted for moderation", comment))
}
