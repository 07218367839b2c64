use std::sync::Arc;

use crate::config::Channels;
use crate::event_store::{EnvelopeUpdate, EventEnvelope, EventStore};
use crate::messaging::{Destination, EventPublisher};

use super::commands::UserEventCommand;
use super::effects::{plan, Effect};
use super::errors::UserEventError;
use super::events::UserEventKind;

// ============================================================================
// User Event Handler
// ============================================================================
//
// Orchestrates: Command -> Event Store -> Effects -> Publisher
//
// The write always comes first. A failed write aborts the command and
// nothing is published; a failed publish is logged and the durable event
// row stands.
//
// ============================================================================

pub struct UserEventHandler {
    store: Arc<dyn EventStore>,
    publisher: Arc<EventPublisher>,
    channels: Channels,
}

impl UserEventHandler {
    pub fn new(store: Arc<dyn EventStore>, publisher: Arc<EventPublisher>, channels: Channels) -> Self {
        Self {
            store,
            publisher,
            channels,
        }
    }

    /// Route a command to its handler by variant and return the stored row.
    pub async fn dispatch(&self, command: UserEventCommand) -> Result<EventEnvelope, UserEventError> {
        validate(&command)?;

        let stored = match &command {
            UserEventCommand::Add {
                request_id,
                event_type,
                data,
                targets,
            } => {
                let envelope = EventEnvelope::request(request_id, event_type, data.clone())
                    .with_targets(targets.clone());
                self.store.register(envelope).await?
            }

            UserEventCommand::UpdatePassword { request_id, data } => {
                let envelope = EventEnvelope::request(
                    request_id,
                    UserEventKind::UpdateUserPassword.as_str(),
                    data.clone(),
                )
                .with_targets(self.channels.sibling_topics());
                self.store.register(envelope).await?
            }

            UserEventCommand::Respond { id, response, .. } => {
                self.store
                    .register_update(*id, EnvelopeUpdate::responded(response.clone()))
                    .await?
            }
        };

        tracing::info!(
            id = %stored.id.map(|id| id.to_string()).unwrap_or_default(),
            request_id = %stored.request_id,
            event_type = %stored.event_type,
            status = stored.status,
            "event registered"
        );

        self.run_effects(plan(&command, &stored, &self.channels)).await;
        Ok(stored)
    }

    async fn run_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            let (payload, key, destination) = match effect {
                Effect::Broadcast { exchange, payload } => {
                    (payload, String::new(), Destination::Exchange(exchange))
                }
                Effect::Produce {
                    topic,
                    key,
                    payload,
                } => (payload, key, Destination::Topic(topic)),
            };

            if let Err(err) = self.publisher.publish(&payload, &key, &destination).await {
                tracing::error!(
                    destination = %destination,
                    error = %err,
                    "event side effect failed"
                );
            }
        }
    }
}

fn validate(command: &UserEventCommand) -> Result<(), UserEventError> {
    if command.request_id().trim().is_empty() {
        return Err(UserEventError::Validation("requestId is required".into()));
    }
    if let UserEventCommand::Add { event_type, .. } = command {
        if event_type.trim().is_empty() {
            return Err(UserEventError::Validation("type is required".into()));
        }
    }
    Ok(())
}
