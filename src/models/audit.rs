//! Audit trail entries written by every record mutation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    pub id: String,
    pub ts: DateTime<Utc>,
    pub resource: String,
    pub action: AuditAction,
    /// Identity the mutation is attributed to
    pub actor: Option<String>,
    /// Snapshot of the affected record; absent when a delete matched nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

/// Audit log listing filter
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditQuery {
    pub resource: Option<String>,
    pub action: Option<AuditAction>,
    pub actor: Option<String>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.resource.as_deref().map_or(true, |r| entry.resource == r)
            && self.action.map_or(true, |a| entry.action == a)
            && self
                .actor
                .as_deref()
                .map_or(true, |a| entry.actor.as_deref() == Some(a))
    }
}
