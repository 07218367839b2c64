use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::envelope::{EnvelopeUpdate, EventEnvelope};
use super::store::{EventStore, StoreError};

/// In-memory event store. Backs unit tests and local runs without Postgres;
/// rows keep insertion order so `all()` matches the relational ordering.
#[derive(Default)]
pub struct MemoryEventStore {
    rows: RwLock<Vec<EventEnvelope>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn register(&self, mut envelope: EventEnvelope) -> Result<EventEnvelope, StoreError> {
        envelope.id = Some(Uuid::new_v4());
        envelope.created_at = Utc::now();

        let mut rows = self.rows.write().await;
        rows.push(envelope.clone());
        Ok(envelope)
    }

    async fn register_update(
        &self,
        id: Uuid,
        update: EnvelopeUpdate,
    ) -> Result<EventEnvelope, StoreError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;

        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(data) = update.data {
            row.data = data;
        }
        if let Some(response) = update.response {
            row.response = Some(response);
        }
        Ok(row.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<EventEnvelope>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id == Some(id)).cloned())
    }

    async fn all(&self) -> Result<Vec<EventEnvelope>, StoreError> {
        Ok(self.rows.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_round_trip() {
        let store = MemoryEventStore::new();
        let envelope = EventEnvelope::request("r1", "create-user", json!([{"username": "alice"}]));

        let stored = store.register(envelope.clone()).await.unwrap();
        let id = stored.id.expect("store assigns an id");

        let fetched = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.request_id, envelope.request_id);
        assert_eq!(fetched.event_type, envelope.event_type);
        assert_eq!(fetched.data, envelope.data);
        assert!(!fetched.status);
        assert!(fetched.response.is_none());
    }

    #[tokio::test]
    async fn test_update_promotes_to_responded_without_new_row() {
        let store = MemoryEventStore::new();
        let stored = store
            .register(EventEnvelope::request("r1", "create-user", json!([])))
            .await
            .unwrap();
        let id = stored.id.unwrap();

        let updated = store
            .register_update(id, EnvelopeUpdate::responded(json!([{"ok": true}])))
            .await
            .unwrap();

        assert!(updated.status);
        assert_eq!(updated.response, Some(json!([{"ok": true}])));
        assert_eq!(updated.request_id, "r1");
        assert_eq!(store.all().await.unwrap().len(), 1);

        // a racing second response stays last-write-wins on the same row
        let overwritten = store
            .register_update(id, EnvelopeUpdate::responded(json!([{"ok": false}])))
            .await
            .unwrap();
        assert_eq!(overwritten.response, Some(json!([{"ok": false}])));
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_for_unknown_id_is_not_found() {
        let store = MemoryEventStore::new();
        let missing = Uuid::new_v4();

        let err = store
            .register_update(missing, EnvelopeUpdate::responded(json!([])))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_request_ids_create_distinct_rows() {
        // the store does not deduplicate by requestId; idempotency is the
        // caller's concern
        let store = MemoryEventStore::new();
        let first = store
            .register(EventEnvelope::request("r1", "create-user", json!([])))
            .await
            .unwrap();
        let second = store
            .register(EventEnvelope::request("r1", "create-user", json!([])))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }
}
