//! Audit log repository.

use super::{Collection, KvStore, RepositoryError, keys};
use crate::models::audit::AuditEntry;

const AUDIT_LOGS: Collection<Vec<AuditEntry>> = Collection::new(keys::AUDIT_LOGS);

/// Maximum number of entries kept; the oldest are dropped first.
pub const MAX_AUDIT_ENTRIES: usize = 1000;

/// Repository for the admin audit trail, stored newest first.
pub struct AuditRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: KvStore> AuditRepository<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Prepend an entry, trimming the log to [`MAX_AUDIT_ENTRIES`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        AUDIT_LOGS
            .mutate(self.store, |entries| {
                entries.insert(0, entry.clone());
                entries.truncate(MAX_AUDIT_ENTRIES);
                Ok(())
            })
            .await
    }

    /// The `limit` most recent entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        let mut entries = AUDIT_LOGS.read(self.store).await?;
        entries.truncate(limit);
        Ok(entries)
    }
}
