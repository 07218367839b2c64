use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::event_store::StoreError;

use super::entry::{AuditAction, AuditEntry, AuditKind};
use super::store::AuditStore;

/// In-memory audit store for unit tests and local runs.
#[derive(Default)]
pub struct MemoryAuditStore {
    next_id: AtomicI64,
    rows: RwLock<HashMap<AuditKind, Vec<AuditEntry>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(
        &self,
        kind: AuditKind,
        action: AuditAction,
        entity_id: &str,
        version: i32,
        update_alias: Option<String>,
    ) -> Result<AuditEntry, StoreError> {
        let entry = AuditEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            action,
            version,
            entity_id: entity_id.to_string(),
            update_alias,
            created_at: Utc::now(),
        };

        let mut rows = self.rows.write().await;
        rows.entry(kind).or_default().push(entry.clone());
        Ok(entry)
    }

    async fn entries(&self, kind: AuditKind, entity_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&kind)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.entity_id == entity_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
