use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Audit log entries
// ============================================================================

/// Lifecycle transition kinds a trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// Which tracked entity a trail observes. The three trails are structurally
/// identical; only the table differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditKind {
    User,
    Trip,
    Post,
}

impl AuditKind {
    pub fn table(&self) -> &'static str {
        match self {
            AuditKind::User => "user_audit_log",
            AuditKind::Trip => "trip_audit_log",
            AuditKind::Post => "post_audit_log",
        }
    }
}

/// One appended row. `id` identifies the log entry, not the tracked entity;
/// `entity_id` is a reference only and never cascades.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: i64,
    pub action: AuditAction,
    /// The tracked entity's optimistic version at the time of the change.
    pub version: i32,
    pub entity_id: String,
    /// Comma-joined changed column names; UPDATE entries only.
    pub update_alias: Option<String>,
    pub created_at: DateTime<Utc>,
}
