//! Blog service: posts, scheduled publication and comment moderation.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};

use chezflora_core::{CommentId, PostId, PostStatus, slugify};

use crate::db::blog::BlogRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::blog::{BlogPost, Comment, NewComment, NewPost, PostUpdate, ScheduledPost};

/// Errors that can occur during blog operations.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("title must not be empty")]
    InvalidTitle,

    #[error("slug {0:?} is already used")]
    DuplicateSlug(String),

    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("post is not published")]
    NotPublished,

    /// Scheduling goes through `schedule_post` so the side table stays in sync.
    #[error("use the schedule operation to schedule a post")]
    ScheduleRequired,

    #[error("scheduled date must be in the future")]
    ScheduleInPast,

    #[error("name and content are required")]
    EmptyComment,
}

/// Blog service over an injected store.
pub struct BlogService<'a, S> {
    blog: BlogRepository<'a, S>,
}

impl<'a, S: KvStore> BlogService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            blog: BlogRepository::new(store),
        }
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Posts, newest first, optionally with one status.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn list_posts(&self, status: Option<PostStatus>) -> Result<Vec<BlogPost>, BlogError> {
        let mut posts = self.blog.posts().await?;
        if let Some(status) = status {
            posts.retain(|p| p.status == status);
        }
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Published posts, most recently published first.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn list_published(&self) -> Result<Vec<BlogPost>, BlogError> {
        let mut posts = self.list_posts(Some(PostStatus::Published)).await?;
        posts.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        Ok(posts)
    }

    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn get_post(&self, id: &PostId) -> Result<Option<BlogPost>, BlogError> {
        Ok(self.blog.posts().await?.into_iter().find(|p| &p.id == id))
    }

    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, BlogError> {
        Ok(self.blog.posts().await?.into_iter().find(|p| p.slug == slug))
    }

    /// Create a draft or published post.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::InvalidTitle`, `BlogError::DuplicateSlug`, or
    /// `BlogError::ScheduleRequired` when asked for the `scheduled` status.
    #[instrument(skip(self, data), fields(title = %data.title))]
    pub async fn create_post(&self, data: NewPost) -> Result<BlogPost, BlogError> {
        let title = data.title.trim().to_owned();
        if title.is_empty() {
            return Err(BlogError::InvalidTitle);
        }
        if data.status == PostStatus::Scheduled {
            return Err(BlogError::ScheduleRequired);
        }
        let slug = slugify(data.slug.as_deref().unwrap_or(&title));
        if slug.is_empty() {
            return Err(BlogError::InvalidTitle);
        }

        let now = Utc::now();
        let post = BlogPost {
            id: PostId::generate(),
            slug,
            title,
            content: data.content,
            excerpt: data.excerpt,
            author: data.author,
            tags: data.tags,
            image: data.image,
            status: data.status,
            publish_date: (data.status == PostStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
        };

        self.blog
            .mutate_posts(|posts| {
                if posts.iter().any(|p| p.slug == post.slug) {
                    return Err(BlogError::DuplicateSlug(post.slug.clone()));
                }
                posts.push(post.clone());
                Ok(())
            })
            .await?;

        info!(post_id = %post.id, status = %post.status, "Post created");
        Ok(post)
    }

    /// Edit a post. Leaving the `scheduled` status drops its schedule entry.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::DuplicateSlug` or `BlogError::ScheduleRequired`.
    #[instrument(skip(self, data), fields(post_id = %id))]
    pub async fn update_post(
        &self,
        id: &PostId,
        data: PostUpdate,
    ) -> Result<Option<BlogPost>, BlogError> {
        if data.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
            return Err(BlogError::InvalidTitle);
        }
        if data.status == Some(PostStatus::Scheduled) {
            return Err(BlogError::ScheduleRequired);
        }
        let slug = data.slug.as_deref().map(slugify);
        if slug.as_ref().is_some_and(String::is_empty) {
            return Err(BlogError::InvalidTitle);
        }

        let updated = self
            .blog
            .mutate_posts(|posts| {
                if let Some(slug) = &slug
                    && posts.iter().any(|p| &p.slug == slug && &p.id != id)
                {
                    return Err(BlogError::DuplicateSlug(slug.clone()));
                }
                let Some(post) = posts.iter_mut().find(|p| &p.id == id) else {
                    return Ok(None);
                };
                let was_scheduled = post.status == PostStatus::Scheduled;
                let data = data.clone();
                let now = Utc::now();

                if let Some(title) = data.title {
                    post.title = title.trim().to_owned();
                }
                if let Some(slug) = &slug {
                    post.slug.clone_from(slug);
                }
                if let Some(content) = data.content {
                    post.content = content;
                }
                if let Some(excerpt) = data.excerpt {
                    post.excerpt = excerpt;
                }
                if let Some(author) = data.author {
                    post.author = author;
                }
                if let Some(tags) = data.tags {
                    post.tags = tags;
                }
                if let Some(image) = data.image {
                    post.image = image;
                }
                if let Some(status) = data.status {
                    if status == PostStatus::Published && post.publish_date.is_none() {
                        post.publish_date = Some(now);
                    }
                    post.status = status;
                }
                post.updated_at = now;
                Ok(Some((post.clone(), was_scheduled)))
            })
            .await?;

        let Some((post, was_scheduled)) = updated else {
            return Ok(None);
        };
        if was_scheduled && post.status != PostStatus::Scheduled {
            self.unschedule(id).await?;
        }
        Ok(Some(post))
    }

    /// Delete a post with its comments and schedule entry.
    ///
    /// # Returns
    ///
    /// Returns `true` if the post was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn delete_post(&self, id: &PostId) -> Result<bool, BlogError> {
        let deleted = self
            .blog
            .mutate_posts(|posts| {
                let before = posts.len();
                posts.retain(|p| &p.id != id);
                Ok::<_, BlogError>(posts.len() != before)
            })
            .await?;
        if !deleted {
            return Ok(false);
        }

        self.blog
            .mutate_comments(|comments| {
                comments.retain(|c| &c.post_id != id);
                Ok::<_, BlogError>(())
            })
            .await?;
        self.unschedule(id).await?;
        Ok(true)
    }

    /// Schedule a post for publication at `at`.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::ScheduleInPast` unless `at` is after `now`.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn schedule_post(
        &self,
        id: &PostId,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<BlogPost>, BlogError> {
        if at <= now {
            return Err(BlogError::ScheduleInPast);
        }

        let scheduled = self
            .blog
            .mutate_posts(|posts| {
                Ok::<_, BlogError>(posts.iter_mut().find(|p| &p.id == id).map(|post| {
                    post.status = PostStatus::Scheduled;
                    post.publish_date = None;
                    post.updated_at = now;
                    post.clone()
                }))
            })
            .await?;
        if scheduled.is_none() {
            return Ok(None);
        }

        self.blog
            .mutate_schedule(|schedule| {
                schedule.retain(|s| &s.post_id != id);
                schedule.push(ScheduledPost {
                    post_id: id.clone(),
                    scheduled_date: at,
                });
                Ok::<_, BlogError>(())
            })
            .await?;
        info!(scheduled_date = %at, "Post scheduled");
        Ok(scheduled)
    }

    /// Publish every scheduled post whose date has passed.
    ///
    /// Due entries are removed from the schedule. A due entry whose post has
    /// meanwhile left the `scheduled` status is dropped without publishing.
    ///
    /// # Returns
    ///
    /// The ids of the posts that were published.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn publish_scheduled_posts(&self, now: DateTime<Utc>) -> Result<Vec<PostId>, BlogError> {
        let due: Vec<PostId> = self
            .blog
            .schedule()
            .await?
            .into_iter()
            .filter(|s| s.scheduled_date <= now)
            .map(|s| s.post_id)
            .collect();
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let published = self
            .blog
            .mutate_posts(|posts| {
                let mut published = Vec::new();
                for post in posts
                    .iter_mut()
                    .filter(|p| p.status == PostStatus::Scheduled && due.contains(&p.id))
                {
                    post.status = PostStatus::Published;
                    post.publish_date = Some(now);
                    post.updated_at = now;
                    published.push(post.id.clone());
                }
                Ok::<_, BlogError>(published)
            })
            .await?;

        self.blog
            .mutate_schedule(|schedule| {
                schedule.retain(|s| !(due.contains(&s.post_id) && s.scheduled_date <= now));
                Ok::<_, BlogError>(())
            })
            .await?;

        if !published.is_empty() {
            info!(count = published.len(), "Published scheduled posts");
        }
        Ok(published)
    }

    /// The publication schedule.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn list_schedule(&self) -> Result<Vec<ScheduledPost>, BlogError> {
        let mut schedule = self.blog.schedule().await?;
        schedule.sort_by_key(|s| s.scheduled_date);
        Ok(schedule)
    }

    async fn unschedule(&self, id: &PostId) -> Result<(), BlogError> {
        self.blog
            .mutate_schedule(|schedule| {
                schedule.retain(|s| &s.post_id != id);
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Submit a comment on a published post. Comments await moderation.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::PostNotFound`, `BlogError::NotPublished` or
    /// `BlogError::EmptyComment`.
    #[instrument(skip(self, data), fields(post_id = %post_id))]
    pub async fn add_comment(&self, post_id: &PostId, data: NewComment) -> Result<Comment, BlogError> {
        let author_name = data.author_name.trim().to_owned();
        let content = data.content.trim().to_owned();
        if author_name.is_empty() || content.is_empty() {
            return Err(BlogError::EmptyComment);
        }
        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| BlogError::PostNotFound(post_id.clone()))?;
        if !post.is_published() {
            return Err(BlogError::NotPublished);
        }

        let comment = Comment {
            id: CommentId::generate(),
            post_id: post_id.clone(),
            author_name,
            author_email: data.author_email,
            content,
            approved: false,
            created_at: Utc::now(),
        };
        self.blog
            .mutate_comments(|comments| {
                comments.push(comment.clone());
                Ok::<_, BlogError>(())
            })
            .await?;
        Ok(comment)
    }

    /// Comments on a post, oldest first. Pending ones only on request.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn list_comments(
        &self,
        post_id: &PostId,
        include_pending: bool,
    ) -> Result<Vec<Comment>, BlogError> {
        let mut comments: Vec<Comment> = self
            .blog
            .comments()
            .await?
            .into_iter()
            .filter(|c| &c.post_id == post_id && (include_pending || c.approved))
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    /// Comments awaiting moderation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    pub async fn list_pending_comments(&self) -> Result<Vec<Comment>, BlogError> {
        let mut comments: Vec<Comment> = self
            .blog
            .comments()
            .await?
            .into_iter()
            .filter(|c| !c.approved)
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    #[instrument(skip(self), fields(comment_id = %id))]
    pub async fn approve_comment(&self, id: &CommentId) -> Result<Option<Comment>, BlogError> {
        self.blog
            .mutate_comments(|comments| {
                Ok(comments.iter_mut().find(|c| &c.id == id).map(|comment| {
                    comment.approved = true;
                    comment.clone()
                }))
            })
            .await
    }

    /// # Errors
    ///
    /// Returns `BlogError::Repository` if the store fails.
    #[instrument(skip(self), fields(comment_id = %id))]
    pub async fn delete_comment(&self, id: &CommentId) -> Result<bool, BlogError> {
        self.blog
            .mutate_comments(|comments| {
                let before = comments.len();
                comments.retain(|c| &c.id != id);
                Ok(comments.len() != before)
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::MemoryStore;

    pub(crate) fn new_post(title: &str, status: PostStatus) -> NewPost {
        NewPost {
            title: title.to_owned(),
            slug: None,
            content: "Les pivoines arrivent !".to_owned(),
            excerpt: None,
            author: "Léa".to_owned(),
            tags: vec!["saison".to_owned()],
            image: None,
            status,
        }
    }

    fn comment(name: &str) -> NewComment {
        NewComment {
            author_name: name.to_owned(),
            author_email: None,
            content: "Magnifique".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_post_slug_and_publish_date() {
        let store = MemoryStore::new();
        let blog = BlogService::new(&store);

        let draft = blog.create_post(new_post("Été en fleurs", PostStatus::Draft)).await.unwrap();
        assert_eq!(draft.slug, "ete-en-fleurs");
        assert!(draft.publish_date.is_none());

        let published = blog.create_post(new_post("Printemps", PostStatus::Published)).await.unwrap();
        assert!(published.publish_date.is_some());

        assert!(matches!(
            blog.create_post(new_post("Été en fleurs", PostStatus::Draft)).await,
            Err(BlogError::DuplicateSlug(_))
        ));
        assert!(matches!(
            blog.create_post(new_post("Later", PostStatus::Scheduled)).await,
            Err(BlogError::ScheduleRequired)
        ));
    }

    #[tokio::test]
    async fn test_due_scheduled_post_is_published_and_unscheduled() {
        let store = MemoryStore::new();
        let blog = BlogService::new(&store);
        let post = blog.create_post(new_post("Roses d'automne", PostStatus::Draft)).await.unwrap();

        let now = Utc::now();
        blog.schedule_post(&post.id, now + Duration::hours(1), now)
            .await
            .unwrap()
            .unwrap();
        assert!(blog.publish_scheduled_posts(now).await.unwrap().is_empty());

        let later = now + Duration::hours(2);
        let published = blog.publish_scheduled_posts(later).await.unwrap();
        assert_eq!(published, vec![post.id.clone()]);

        let post = blog.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Published);
        assert_eq!(post.publish_date, Some(later));
        assert!(blog.list_schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_rejects_past_and_unschedules_on_status_change() {
        let store = MemoryStore::new();
        let blog = BlogService::new(&store);
        let post = blog.create_post(new_post("Tulipes", PostStatus::Draft)).await.unwrap();
        let now = Utc::now();

        assert!(matches!(
            blog.schedule_post(&post.id, now - Duration::minutes(1), now).await,
            Err(BlogError::ScheduleInPast)
        ));

        blog.schedule_post(&post.id, now + Duration::days(1), now).await.unwrap();
        let update = PostUpdate {
            status: Some(PostStatus::Draft),
            ..PostUpdate::default()
        };
        blog.update_post(&post.id, update).await.unwrap().unwrap();
        assert!(blog.list_schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_need_published_post_and_approval() {
        let store = MemoryStore::new();
        let blog = BlogService::new(&store);
        let draft = blog.create_post(new_post("Brouillon", PostStatus::Draft)).await.unwrap();
        assert!(matches!(
            blog.add_comment(&draft.id, comment("Ana")).await,
            Err(BlogError::NotPublished)
        ));

        let post = blog.create_post(new_post("Publié", PostStatus::Published)).await.unwrap();
        let c = blog.add_comment(&post.id, comment("Ana")).await.unwrap();
        assert!(blog.list_comments(&post.id, false).await.unwrap().is_empty());
        assert_eq!(blog.list_pending_comments().await.unwrap().len(), 1);

        blog.approve_comment(&c.id).await.unwrap().unwrap();
        assert_eq!(blog.list_comments(&post.id, false).await.unwrap().len(), 1);

        assert!(blog.delete_post(&post.id).await.unwrap());
        assert!(blog.list_comments(&post.id, true).await.unwrap().is_empty());
    }
}
