use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::audit::AuditTrail;
use crate::domain::user_events::SubscribedEventKind;
use crate::messaging::RedisBroadcast;

// ============================================================================
// Broadcast subscriber - fanout transport inbound
// ============================================================================
//
// One service listens to one exchange; events for different services are
// separated by the type tag. Receipt is the acknowledgment - the fanout
// transport has no redelivery, so a processing failure only ever costs that
// one message.
//
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubscribedEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

pub struct UserEventSubscriber {
    broadcast: Arc<RedisBroadcast>,
    exchange: String,
    trip_audit: AuditTrail,
    post_audit: AuditTrail,
}

impl UserEventSubscriber {
    pub fn new(
        broadcast: Arc<RedisBroadcast>,
        exchange: String,
        trip_audit: AuditTrail,
        post_audit: AuditTrail,
    ) -> Self {
        Self {
            broadcast,
            exchange,
            trip_audit,
            post_audit,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let (sink, mut inbox) = mpsc::unbounded_channel();
        let broadcast = self.broadcast.clone();
        let exchange = self.exchange.clone();
        tokio::spawn(async move {
            if let Err(err) = broadcast.listen(&exchange, sink).await {
                tracing::error!(exchange, error = %err, "broadcast listener stopped");
            }
        });

        while let Some(payload) = inbox.recv().await {
            self.execute(&payload).await;
        }
        Ok(())
    }

    /// Dispatch one received payload. Unknown or malformed events are logged
    /// and dropped; this must never take the loop down.
    pub async fn execute(&self, payload: &str) {
        let envelope: SubscribedEnvelope = match serde_json::from_str(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(error = %err, "undecodable broadcast event, dropped");
                return;
            }
        };

        // the entity row is the CRUD layer's write; the trail records the
        // lifecycle fact observed over the wire
        match SubscribedEventKind::parse(&envelope.kind) {
            Some(SubscribedEventKind::CreateTrip) => {
                let (id, version) = entity_ref(&envelope.data);
                self.trip_audit.record_create(&id, version).await;
            }
            Some(SubscribedEventKind::CreatePost) => {
                let (id, version) = entity_ref(&envelope.data);
                self.post_audit.record_create(&id, version).await;
            }
            None => {
                tracing::warn!(kind = %envelope.kind, "unknown broadcast event, dropped");
            }
        }
    }
}

fn entity_ref(data: &Value) -> (String, i32) {
    let id = data
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let version = data
        .get("version")
        .and_then(Value::as_i64)
        .unwrap_or(1) as i32;
    (id, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditKind, AuditStore, MemoryAuditStore};
    use serde_json::json;

    fn subscriber() -> (UserEventSubscriber, Arc<MemoryAuditStore>) {
        let store = Arc::new(MemoryAuditStore::new());
        let broadcast =
            Arc::new(RedisBroadcast::connect("redis://127.0.0.1:6382").expect("static url"));
        let subscriber = UserEventSubscriber::new(
            broadcast,
            "onepiece-user".into(),
            AuditTrail::new(AuditKind::Trip, store.clone()),
            AuditTrail::new(AuditKind::Post, store.clone()),
        );
        (subscriber, store)
    }

    #[tokio::test]
    async fn test_create_trip_event_records_trip_audit() {
        let (subscriber, store) = subscriber();

        subscriber
            .execute(&json!({"type": "create-trip", "data": {"id": "t-9", "version": 1}}).to_string())
            .await;

        let entries = store.entries(AuditKind::Trip, "t-9").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(store.entries(AuditKind::Post, "t-9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_post_event_records_post_audit() {
        let (subscriber, store) = subscriber();

        subscriber
            .execute(&json!({"type": "create-post", "data": {"id": "p-3"}}).to_string())
            .await;

        let entries = store.entries(AuditKind::Post, "p-3").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, 1);
    }

    #[tokio::test]
    async fn test_unknown_kind_and_garbage_are_dropped() {
        let (subscriber, store) = subscriber();

        subscriber
            .execute(&json!({"type": "create-galaxy", "data": {"id": "g-1"}}).to_string())
            .await;
        subscriber.execute("{{{ nope").await;

        assert!(store.entries(AuditKind::Trip, "g-1").await.unwrap().is_empty());
        assert!(store.entries(AuditKind::Post, "g-1").await.unwrap().is_empty());
    }
}
