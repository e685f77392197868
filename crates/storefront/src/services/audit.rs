//! Audit log of back-office actions.

use chrono::Utc;
use tracing::warn;

use chezflora_core::{AuditLogId, UserId};

use crate::db::audit::AuditRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::audit::AuditEntry;

/// Records and lists admin actions.
pub struct AuditService<'a, S> {
    entries: AuditRepository<'a, S>,
}

impl<'a, S: KvStore> AuditService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            entries: AuditRepository::new(store),
        }
    }

    /// Record an action.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn record(
        &self,
        actor: Option<&UserId>,
        action: &str,
        entity: &str,
        entity_id: &str,
        details: serde_json::Value,
    ) -> Result<AuditEntry, RepositoryError> {
        let entry = AuditEntry {
            id: AuditLogId::generate(),
            actor: actor.cloned(),
            action: action.to_owned(),
            entity: entity.to_owned(),
            entity_id: entity_id.to_owned(),
            details,
            created_at: Utc::now(),
        };
        self.entries.append(&entry).await?;
        Ok(entry)
    }

    /// Record an action that has already been committed, logging on failure.
    pub async fn record_or_warn(
        &self,
        actor: Option<&UserId>,
        action: &str,
        entity: &str,
        entity_id: &str,
        details: serde_json::Value,
    ) {
        if let Err(e) = self.record(actor, action, entity, entity_id, details).await {
            warn!(action, entity, entity_id, error = %e, "Failed to write audit entry");
        }
    }

    /// The `limit` most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.entries.recent(limit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;
    use crate::db::audit::MAX_AUDIT_ENTRIES;

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let store = MemoryStore::new();
        let audit = AuditService::new(&store);
        let admin = UserId::new("admin");
        audit.record(Some(&admin), "create", "product", "p1", json!({})).await.unwrap();
        audit.record(None, "publish", "post", "b1", json!({})).await.unwrap();

        let recent = audit.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.first().map(|e| e.action.as_str()), Some("publish"));
        assert_eq!(audit.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_log_is_capped() {
        let store = MemoryStore::new();
        let audit = AuditService::new(&store);
        for i in 0..=MAX_AUDIT_ENTRIES {
            audit.record(None, "touch", "product", &i.to_string(), json!(null)).await.unwrap();
        }
        let all = audit.recent(usize::MAX).await.unwrap();
        assert_eq!(all.len(), MAX_AUDIT_ENTRIES);
        assert_eq!(all.first().map(|e| e.entity_id.clone()), Some(MAX_AUDIT_ENTRIES.to_string()));
    }
}
