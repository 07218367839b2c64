use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use crate::domain::user_events::{UserEventCommand, UserEventError, UserEventHandler};
use crate::event_store::EventEnvelope;

// ============================================================================
// Response Correlator
// ============================================================================
//
// Turns a completed unit of work back into a response event addressed to the
// original requestId. The reply channel is shared by all response types, so
// every reply carries both requestId (for matching) and type (so the
// listener knows how to read the payload).
//
// Matching is explicit: callers park a oneshot under their requestId and the
// reply listener completes and removes it. A caller that times out abandons
// its slot rather than leaving it behind.
//
// ============================================================================

pub struct ResponseCorrelator {
    handler: Arc<UserEventHandler>,
    pending: Mutex<HashMap<String, oneshot::Sender<EventEnvelope>>>,
}

impl ResponseCorrelator {
    pub fn new(handler: Arc<UserEventHandler>) -> Self {
        Self {
            handler,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Persist the response against the original envelope and publish the
    /// reply. The store write happens first; a publish failure leaves the
    /// RESPONDED row in place.
    pub async fn respond(
        &self,
        id: Uuid,
        request_id: &str,
        event_type: &str,
        response: Value,
    ) -> Result<EventEnvelope, UserEventError> {
        self.handler
            .dispatch(UserEventCommand::Respond {
                id,
                request_id: request_id.to_string(),
                event_type: event_type.to_string(),
                response,
            })
            .await
    }

    /// Park a waiter for `request_id`. A second registration for the same id
    /// replaces the first; only one legitimate responder exists per request.
    pub async fn register_waiter(&self, request_id: &str) -> oneshot::Receiver<EventEnvelope> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        if pending.insert(request_id.to_string(), tx).is_some() {
            tracing::warn!(request_id, "replaced existing reply waiter");
        }
        rx
    }

    /// Drop the waiter for `request_id`, e.g. after a caller-side timeout.
    pub async fn abandon(&self, request_id: &str) {
        self.pending.lock().await.remove(request_id);
    }

    /// Hand an inbound reply to its waiter. Returns false when nobody is
    /// waiting (already matched, timed out, or owned by another process).
    pub async fn complete(&self, envelope: EventEnvelope) -> bool {
        let sender = self.pending.lock().await.remove(&envelope.request_id);
        match sender {
            Some(sender) => match sender.send(envelope) {
                Ok(()) => true,
                Err(envelope) => {
                    tracing::warn!(
                        request_id = %envelope.request_id,
                        "reply waiter went away before delivery"
                    );
                    false
                }
            },
            None => {
                tracing::debug!(
                    request_id = %envelope.request_id,
                    "reply with no pending waiter, dropped"
                );
                false
            }
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_channels;
    use crate::event_store::{EventStore, MemoryEventStore};
    use crate::messaging::test_support::FakeTransports;
    use crate::messaging::EventPublisher;
    use serde_json::json;

    struct Rig {
        store: Arc<MemoryEventStore>,
        fakes: Arc<FakeTransports>,
        correlator: ResponseCorrelator,
    }

    fn rig() -> Rig {
        let store = Arc::new(MemoryEventStore::new());
        let fakes = Arc::new(FakeTransports::default());
        let publisher = Arc::new(EventPublisher::new(fakes.clone(), fakes.clone()));
        let handler = Arc::new(UserEventHandler::new(
            store.clone(),
            publisher,
            test_channels(),
        ));
        Rig {
            store,
            fakes,
            correlator: ResponseCorrelator::new(handler),
        }
    }

    #[tokio::test]
    async fn test_respond_promotes_and_publishes_reply_exactly_once() {
        let rig = rig();
        let stored = rig
            .store
            .register(EventEnvelope::request("r1", "create-user", json!([])))
            .await
            .unwrap();
        let id = stored.id.unwrap();

        let responded = rig
            .correlator
            .respond(id, "r1", "create-user", json!([{"ok": true}]))
            .await
            .unwrap();

        assert!(responded.status);
        assert_eq!(rig.store.all().await.unwrap().len(), 1);

        let produced = rig.fakes.produced.lock().unwrap();
        let replies: Vec<_> = produced
            .iter()
            .filter(|(topic, _, _)| topic == "user-event-reply")
            .collect();
        assert_eq!(replies.len(), 1);
        let reply: serde_json::Value = serde_json::from_str(&replies[0].2).unwrap();
        assert_eq!(reply["requestId"], "r1");
        assert_eq!(reply["type"], "create-user");
    }

    #[tokio::test]
    async fn test_waiter_receives_matching_reply_and_slot_is_removed() {
        let rig = rig();
        let receiver = rig.correlator.register_waiter("r1").await;

        let mut reply = EventEnvelope::request("r1", "create-user", json!([]));
        reply.status = true;
        reply.response = Some(json!([{"ok": true}]));

        assert!(rig.correlator.complete(reply).await);
        assert_eq!(rig.correlator.pending_count().await, 0);

        let received = receiver.await.unwrap();
        assert_eq!(received.request_id, "r1");
        assert!(received.is_responded());
    }

    #[tokio::test]
    async fn test_reply_without_waiter_is_dropped() {
        let rig = rig();
        let reply = EventEnvelope::request("r-unknown", "create-user", json!([]));
        assert!(!rig.correlator.complete(reply).await);
    }

    #[tokio::test]
    async fn test_abandon_clears_the_pending_slot() {
        let rig = rig();
        let _receiver = rig.correlator.register_waiter("r1").await;
        assert_eq!(rig.correlator.pending_count().await, 1);

        rig.correlator.abandon("r1").await;
        assert_eq!(rig.correlator.pending_count().await, 0);

        let reply = EventEnvelope::request("r1", "create-user", json!([]));
        assert!(!rig.correlator.complete(reply).await);
    }
}
