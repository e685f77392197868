//! Back-office audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::{AuditLogId, UserId};

/// One recorded admin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditLogId,
    /// Who did it; `None` for system jobs such as the post publisher.
    #[serde(default)]
    pub actor: Option<UserId>,
    /// Verb, e.g. `update_status`.
    pub action: String,
    /// Entity kind, e.g. `order`.
    pub entity: String,
    pub entity_id: String,
    #[serde(default)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
