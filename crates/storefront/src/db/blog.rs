//! Blog repository: posts, comments and the publication schedule.

use super::{Collection, KvStore, RepositoryError, keys};
use crate::models::blog::{BlogPost, Comment, ScheduledPost};

const POSTS: Collection<Vec<BlogPost>> = Collection::new(keys::BLOG_POSTS);
const COMMENTS: Collection<Vec<Comment>> = Collection::new(keys::BLOG_COMMENTS);
const SCHEDULE: Collection<Vec<ScheduledPost>> = Collection::new(keys::SCHEDULED_POSTS);

/// Repository for blog content.
pub struct BlogRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> BlogRepository<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn posts(&self) -> Result<Vec<BlogPost>, RepositoryError> {
        POSTS.read(self.store).await
    }

    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate_posts<R, E, F>(&self, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<BlogPost>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        POSTS.mutate(self.store, apply).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn comments(&self) -> Result<Vec<Comment>, RepositoryError> {
        COMMENTS.read(self.store).await
    }

    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate_comments<R, E, F>(&self, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<Comment>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        COMMENTS.mutate(self.store, apply).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn schedule(&self) -> Result<Vec<ScheduledPost>, RepositoryError> {
        SCHEDULE.read(self.store).await
    }

    /// # Errors
    ///
    /// Returns the error from `apply` or a storage error.
    pub async fn mutate_schedule<R, E, F>(&self, apply: F) -> Result<R, E>
    where
        F: FnMut(&mut Vec<ScheduledPost>) -> Result<R, E> + Send,
        R: Send,
        E: From<RepositoryError>,
    {
        SCHEDULE.mutate(self.store, apply).await
    }
}
