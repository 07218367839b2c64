use std::sync::Arc;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::audit::AuditTrail;
use crate::config::Config;
use crate::correlator::ResponseCorrelator;
use crate::domain::user_events::{UserEventCommand, UserEventHandler, UserEventKind};
use crate::event_store::EventEnvelope;
use crate::utils::{retry_with_backoff, BackoffPolicy};

use super::routes::{ApiEvent, ApiRoute, RouteTable};

// ============================================================================
// User event consumer - partitioned transport inbound
// ============================================================================
//
// Subscribes to the user-event topic under an environment-configured group
// id. Each message is decoded as either an HTTP-bridge event (routed by
// path) or a typed envelope (routed by its type tag). Unmatched messages
// are logged and dropped; nothing in here may crash the loop. Offsets are
// committed on an interval after batched consumption, so delivery is
// at-least-once.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Dropped,
}

/// Decode-and-dispatch logic, split from the consumer loop so it can be
/// exercised without a broker.
pub struct UserEventProcessor {
    routes: RouteTable,
    handler: Arc<UserEventHandler>,
    correlator: Arc<ResponseCorrelator>,
    audit: AuditTrail,
    backoff: BackoffPolicy,
}

impl UserEventProcessor {
    pub fn new(
        routes: RouteTable,
        handler: Arc<UserEventHandler>,
        correlator: Arc<ResponseCorrelator>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            routes,
            handler,
            correlator,
            audit,
            backoff: BackoffPolicy::default(),
        }
    }

    pub async fn process(&self, payload: &[u8]) -> Disposition {
        let body: Value = match serde_json::from_slice(payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = %err, "undecodable message, dropped");
                return Disposition::Dropped;
            }
        };

        if body.get("path").map(Value::is_string).unwrap_or(false) {
            return self.process_api_event(body).await;
        }
        if body.get("type").is_some() {
            return self.process_typed_envelope(body).await;
        }

        tracing::warn!("message without path or type, dropped");
        Disposition::Dropped
    }

    async fn process_api_event(&self, body: Value) -> Disposition {
        let event: ApiEvent = match serde_json::from_value(body) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, "bad api event, dropped");
                return Disposition::Dropped;
            }
        };

        let path = event.path.as_deref().unwrap_or_default();
        match self.routes.resolve(path) {
            Some(ApiRoute::SignUp) => self.handle_signup(event).await,
            Some(ApiRoute::UpdatePassword) => {
                // received and acknowledged; the password flow originates on
                // the HTTP side and only its response travels this topic
                tracing::info!(path, "update-password bridge event received");
                Disposition::Handled
            }
            None => {
                tracing::warn!(path, "no route for api event, dropped");
                Disposition::Dropped
            }
        }
    }

    async fn process_typed_envelope(&self, body: Value) -> Disposition {
        let envelope: EventEnvelope = match serde_json::from_value(body) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(error = %err, "bad envelope, dropped");
                return Disposition::Dropped;
            }
        };

        match UserEventKind::parse(&envelope.event_type) {
            Some(UserEventKind::CreateUser) => {
                // same path as the HTTP controller: register, audit, respond
                let event = ApiEvent {
                    id: Some(envelope.request_id.clone()),
                    path: None,
                    body: match envelope.data {
                        Value::Array(items) => items,
                        other => vec![other],
                    },
                };
                self.handle_signup(event).await
            }
            Some(kind) => {
                tracing::info!(kind = %kind, "typed envelope received");
                Disposition::Handled
            }
            None => {
                tracing::warn!(
                    event_type = %envelope.event_type,
                    "unknown envelope type, dropped"
                );
                Disposition::Dropped
            }
        }
    }

    async fn handle_signup(&self, event: ApiEvent) -> Disposition {
        let Some(request_id) = event.id.filter(|id| !id.trim().is_empty()) else {
            tracing::warn!("signup event without requestId, dropped");
            return Disposition::Dropped;
        };

        let data = Value::Array(event.body.clone());
        let registered = retry_with_backoff(&self.backoff, "register-signup-event", || {
            self.handler.dispatch(UserEventCommand::add(
                request_id.clone(),
                UserEventKind::CreateUser.as_str(),
                data.clone(),
            ))
        })
        .await;

        let stored = match registered {
            Ok(stored) => stored,
            Err(err) => {
                tracing::error!(request_id, error = %err, "signup event registration failed");
                return Disposition::Dropped;
            }
        };
        let Some(event_id) = stored.id else {
            tracing::error!(request_id, "stored envelope missing id");
            return Disposition::Dropped;
        };

        // the entity row itself is written by the CRUD layer; the trail
        // records the lifecycle fact here
        let user_id = event
            .body
            .first()
            .and_then(|entry| entry.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.audit.record_create(&user_id, 1).await;

        let response = json!([{
            "statusCode": 201,
            "status": "success",
            "userId": user_id,
        }]);
        if let Err(err) = self
            .correlator
            .respond(event_id, &request_id, UserEventKind::CreateUser.as_str(), response)
            .await
        {
            tracing::error!(request_id, error = %err, "signup response failed");
            return Disposition::Dropped;
        }

        Disposition::Handled
    }
}

pub struct UserEventConsumer {
    consumer: StreamConsumer,
    topic: String,
    processor: UserEventProcessor,
}

impl UserEventConsumer {
    pub fn new(config: &Config, processor: UserEventProcessor) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000")
            .set("auto.offset.reset", "earliest")
            .create()?;

        Ok(Self {
            consumer,
            topic: config.channels.user_topic.clone(),
            processor,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.consumer.subscribe(&[self.topic.as_str()])?;
        tracing::info!(topic = %self.topic, "user event consumer subscribed");

        loop {
            match self.consumer.recv().await {
                Err(err) => tracing::error!(error = %err, "consume error"),
                Ok(message) => {
                    let Some(payload) = message.payload() else {
                        continue;
                    };
                    let disposition = self.processor.process(payload).await;
                    tracing::debug!(
                        offset = message.offset(),
                        partition = message.partition(),
                        ?disposition,
                        "message processed"
                    );
                }
            }
        }
    }
}
