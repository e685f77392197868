//! Blog posts, scheduling side table and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::{CommentId, Email, PostId, PostStatus};

use super::deserialize_some;

/// A blog article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: PostId,
    pub slug: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub status: PostStatus,
    /// When the post went public.
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

/// Entry of the scheduled-publication side table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPost {
    pub post_id: PostId,
    pub scheduled_date: DateTime<Utc>,
}

/// A reader comment. Only approved comments are shown publicly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_name: String,
    #[serde(default)]
    pub author_email: Option<Email>,
    pub content: String,
    #[serde(default)]
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image: Option<String>,
    /// `draft` or `published`; scheduling has its own operation.
    #[serde(default)]
    pub status: PostStatus,
}

/// Partial update of a post. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub excerpt: Option<Option<String>>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    pub status: Option<PostStatus>,
}

/// Input for a reader comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author_name: String,
    pub author_email: Option<Email>,
    pub content: String,
}

/// Request body for scheduling a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub scheduled_date: DateTime<Utc>,
}
