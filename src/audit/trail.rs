use std::sync::Arc;

use super::entry::{AuditAction, AuditEntry, AuditKind};
use super::store::AuditStore;

// ============================================================================
// Audit Trail - passive lifecycle observer for one entity type
// ============================================================================
//
// Invoked after the primary entity write already committed. A failed audit
// write is a secondary error: it gets logged and the primary result stands.
// There is deliberately no way for this component to fail the write it
// observes.
//
// ============================================================================

#[derive(Clone)]
pub struct AuditTrail {
    kind: AuditKind,
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(kind: AuditKind, store: Arc<dyn AuditStore>) -> Self {
        Self { kind, store }
    }

    pub async fn record_create(&self, entity_id: &str, version: i32) -> Option<AuditEntry> {
        self.append(AuditAction::Create, entity_id, version, None).await
    }

    pub async fn record_update(
        &self,
        entity_id: &str,
        version: i32,
        changed_columns: &[&str],
    ) -> Option<AuditEntry> {
        self.append(
            AuditAction::Update,
            entity_id,
            version,
            Some(changed_columns.join(",")),
        )
        .await
    }

    pub async fn record_delete(&self, entity_id: &str, version: i32) -> Option<AuditEntry> {
        self.append(AuditAction::Delete, entity_id, version, None).await
    }

    async fn append(
        &self,
        action: AuditAction,
        entity_id: &str,
        version: i32,
        update_alias: Option<String>,
    ) -> Option<AuditEntry> {
        match self
            .store
            .append(self.kind, action, entity_id, version, update_alias)
            .await
        {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::error!(
                    kind = ?self.kind,
                    action = action.as_str(),
                    entity_id,
                    error = %err,
                    "audit write failed after primary write committed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::memory::MemoryAuditStore;

    fn trail(kind: AuditKind) -> (AuditTrail, Arc<MemoryAuditStore>) {
        let store = Arc::new(MemoryAuditStore::new());
        (AuditTrail::new(kind, store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_update_delete_lifecycle() {
        let (trail, store) = trail(AuditKind::User);

        trail.record_create("u1", 1).await.unwrap();
        trail.record_update("u1", 2, &["email"]).await.unwrap();
        trail.record_delete("u1", 2).await.unwrap();

        let entries = store.entries(AuditKind::User, "u1").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].action, AuditAction::Create);
        assert_eq!(entries[1].action, AuditAction::Update);
        assert_eq!(entries[2].action, AuditAction::Delete);
        assert!(entries[0].update_alias.is_none());
    }

    #[tokio::test]
    async fn test_update_joins_changed_columns_with_comma() {
        let (trail, store) = trail(AuditKind::Trip);

        let entry = trail
            .record_update("t1", 3, &["startDate", "endDate"])
            .await
            .unwrap();

        assert_eq!(entry.update_alias.as_deref(), Some("startDate,endDate"));
        assert_eq!(store.entries(AuditKind::Trip, "t1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_entries_are_append_only_and_ordered() {
        let (trail, store) = trail(AuditKind::Post);

        for version in 1..=4 {
            trail.record_update("p1", version, &["content"]).await;
        }

        let entries = store.entries(AuditKind::Post, "p1").await.unwrap();
        assert_eq!(entries.len(), 4);
        for pair in entries.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    struct RefusingStore;

    #[async_trait::async_trait]
    impl AuditStore for RefusingStore {
        async fn append(
            &self,
            _: AuditKind,
            _: AuditAction,
            _: &str,
            _: i32,
            _: Option<String>,
        ) -> Result<AuditEntry, crate::event_store::StoreError> {
            Err(crate::event_store::StoreError::Storage("disk full".into()))
        }

        async fn entries(
            &self,
            _: AuditKind,
            _: &str,
        ) -> Result<Vec<AuditEntry>, crate::event_store::StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_audit_failure_is_swallowed_as_secondary_error() {
        let trail = AuditTrail::new(AuditKind::User, Arc::new(RefusingStore));
        // returns None instead of propagating; the primary write stands
        assert!(trail.record_create("u1", 1).await.is_none());
    }
}
