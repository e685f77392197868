//! Background publisher for scheduled blog posts.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::db::KvStore;
use crate::services::audit::AuditService;
use crate::services::blog::BlogService;

/// Default interval between publication passes.
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a task that publishes due posts every `every`.
///
/// The first pass runs immediately, so posts that fell due while the server
/// was down go out at startup. A failed pass is logged and retried on the
/// next tick. Abort the returned handle to stop the task.
pub fn spawn_post_publisher<S>(store: S, every: Duration) -> JoinHandle<()>
where
    S: KvStore + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            run_once(&store).await;
        }
    })
}

/// One publication pass.
pub async fn run_once<S: KvStore>(store: &S) {
    match BlogService::new(store).publish_scheduled_posts(Utc::now()).await {
        Ok(published) if published.is_empty() => debug!("No scheduled posts due"),
        Ok(published) => {
            let audit = AuditService::new(store);
            for id in &published {
                audit
                    .record_or_warn(None, "publish", "post", id.as_str(), json!({ "scheduled": true }))
                    .await;
            }
        }
        Err(e) => error!(error = %e, "Scheduled post publication failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chezflora_core::{PostId, PostStatus};

    use super::*;
    use crate::db::MemoryStore;
    use crate::db::RepositoryError;
    use crate::db::blog::BlogRepository;
    use crate::models::blog::{BlogPost, ScheduledPost};

    async fn seed_overdue_post(store: &MemoryStore) -> PostId {
        let now = Utc::now();
        let id = PostId::new("overdue");
        let post = BlogPost {
            id: id.clone(),
            slug: "overdue".to_owned(),
            title: "Overdue".to_owned(),
            content: String::new(),
            excerpt: None,
            author: "Léa".to_owned(),
            tags: Vec::new(),
            image: None,
            status: PostStatus::Scheduled,
            publish_date: None,
            created_at: now,
            updated_at: now,
        };
        let repo = BlogRepository::new(store);
        repo.mutate_posts(|posts| {
            posts.push(post.clone());
            Ok::<_, RepositoryError>(())
        })
        .await
        .unwrap();
        repo.mutate_schedule(|schedule| {
            schedule.push(ScheduledPost {
                post_id: id.clone(),
                scheduled_date: now - chrono::Duration::minutes(5),
            });
            Ok::<_, RepositoryError>(())
        })
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_first_tick_publishes_overdue_posts() {
        let store = MemoryStore::new();
        let id = seed_overdue_post(&store).await;

        let handle = spawn_post_publisher(store.clone(), Duration::from_secs(3600));
        let published = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let post = BlogService::new(&store).get_post(&id).await.unwrap().unwrap();
                if post.status == PostStatus::Published {
                    break post;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        handle.abort();

        assert!(published.publish_date.is_some());
        assert!(BlogRepository::new(&store).schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publication_is_audited() {
        let store = MemoryStore::new();
        seed_overdue_post(&store).await;
        run_once(&store).await;

        let entries = AuditService::new(&store).recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.first().is_some_and(|e| e.actor.is_none() && e.action == "publish"));
    }
}
