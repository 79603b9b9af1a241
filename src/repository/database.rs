//! The persisted record blob

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{AuditLogEntry, Record};

/// Collection that holds the audit trail
pub const AUDIT_RESOURCE: &str = "auditLogs";

/// Collections present in a freshly initialized store
pub const DEFAULT_COLLECTIONS: &[&str] = &[
    "users",
    "schools",
    "branches",
    "classes",
    "students",
    "teachers",
    "parents",
    "subjects",
    "exams",
    "grades",
    "assignments",
    "attendance",
    "fees",
    "payments",
    "payrolls",
    "books",
    "borrows",
    "fines",
    "tasks",
    "shifts",
    "leaves",
    "notifications",
    "messages",
    "inventory",
    "assets",
    "transportRoutes",
    "buses",
    "hostelRooms",
    "canteenMenus",
    "healthRecords",
];

/// Every collection, keyed by resource name, newest record first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(rename = "auditLogs", default)]
    pub audit_logs: Vec<AuditLogEntry>,
    #[serde(flatten)]
    pub collections: BTreeMap<String, Vec<Record>>,
}

impl Database {
    pub fn with_default_collections() -> Self {
        Self {
            audit_logs: Vec::new(),
            collections: DEFAULT_COLLECTIONS
                .iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
        }
    }

    pub fn collection(&self, resource: &str) -> &[Record] {
        self.collections
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn collection_mut(&mut self, resource: &str) -> &mut Vec<Record> {
        self.collections.entry(resource.to_string()).or_default()
    }

    /// Record an audit entry, keeping only the newest `capacity` entries
    pub fn push_audit(&mut self, entry: AuditLogEntry, capacity: usize) {
        self.audit_logs.insert(0, entry);
        self.audit_logs.truncate(capacity);
    }

    /// True when no collection holds any record
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }
}
