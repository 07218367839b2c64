use serde_json::{json, Value};

use crate::config::Channels;
use crate::event_store::EventEnvelope;

use super::commands::UserEventCommand;

// ============================================================================
// Effects - side effects derived from a persisted event
// ============================================================================
//
// A pure function from (command, stored envelope) to the list of publishes
// to run. Nothing here touches a transport or buffers state; the command
// handler executes the list only after the store write succeeded, and each
// entry is executed independently of the others.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fan out to every listener currently bound to the exchange.
    Broadcast { exchange: String, payload: Value },
    /// Keyed publish to one partitioned topic.
    Produce {
        topic: String,
        key: String,
        payload: Value,
    },
}

pub fn plan(command: &UserEventCommand, stored: &EventEnvelope, channels: &Channels) -> Vec<Effect> {
    // stored came back from a successful write, so the id is present
    let id = stored
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| stored.request_id.clone());

    match command {
        UserEventCommand::Add { .. } => {
            let mut effects = vec![Effect::Broadcast {
                exchange: channels.trip_exchange.clone(),
                payload: json!({ "type": stored.event_type, "data": stored.data }),
            }];
            for target in &stored.targets {
                effects.push(Effect::Produce {
                    topic: target.clone(),
                    key: id.clone(),
                    payload: envelope_payload(stored),
                });
            }
            effects
        }

        // Announce {id, type} per target; downstream services use the id to
        // address their response back to this envelope.
        UserEventCommand::UpdatePassword { .. } => stored
            .targets
            .iter()
            .map(|target| Effect::Produce {
                topic: target.clone(),
                key: id.clone(),
                payload: json!({ "id": stored.id, "type": stored.event_type }),
            })
            .collect(),

        // The reply carries the whole envelope: requestId for matching,
        // type so the listener knows how to read `response`.
        UserEventCommand::Respond { .. } => vec![Effect::Produce {
            topic: channels.reply_topic.clone(),
            key: id,
            payload: envelope_payload(stored),
        }],
    }
}

fn envelope_payload(envelope: &EventEnvelope) -> Value {
    serde_json::to_value(envelope).unwrap_or_else(|_| Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_channels;
    use crate::event_store::EventEnvelope;
    use uuid::Uuid;

    fn stored(event_type: &str, targets: Vec<String>) -> EventEnvelope {
        let mut envelope =
            EventEnvelope::request("r1", event_type, json!([{"username": "alice"}]))
                .with_targets(targets);
        envelope.id = Some(Uuid::new_v4());
        envelope
    }

    #[test]
    fn test_add_broadcasts_and_replicates_to_targets() {
        let channels = test_channels();
        let command = UserEventCommand::add("r1", "create-user", json!([]));
        let stored = stored("create-user", vec!["trip-event".into(), "chat-event".into()]);

        let effects = plan(&command, &stored, &channels);

        assert_eq!(effects.len(), 3);
        assert!(matches!(
            &effects[0],
            Effect::Broadcast { exchange, .. } if exchange == "onepiece-trip"
        ));
        let topics: Vec<_> = effects[1..]
            .iter()
            .map(|effect| match effect {
                Effect::Produce { topic, .. } => topic.clone(),
                other => panic!("unexpected effect: {other:?}"),
            })
            .collect();
        assert_eq!(topics, vec!["trip-event", "chat-event"]);
    }

    #[test]
    fn test_update_password_announces_id_and_type_per_target() {
        let channels = test_channels();
        let command = UserEventCommand::UpdatePassword {
            request_id: "r1".into(),
            data: json!([]),
        };
        let stored = stored("update-user-password", channels.sibling_topics());

        let effects = plan(&command, &stored, &channels);

        assert_eq!(effects.len(), 3);
        for effect in &effects {
            let Effect::Produce { key, payload, .. } = effect else {
                panic!("announcement must use the partitioned transport");
            };
            assert_eq!(key, &stored.id.unwrap().to_string());
            assert_eq!(payload["id"], json!(stored.id));
            assert_eq!(payload["type"], "update-user-password");
        }
    }

    #[test]
    fn test_respond_publishes_once_to_the_reply_topic() {
        let channels = test_channels();
        let id = Uuid::new_v4();
        let command = UserEventCommand::Respond {
            id,
            request_id: "r1".into(),
            event_type: "create-user".into(),
            response: json!([{"ok": true}]),
        };
        let mut responded = stored("create-user", vec![]);
        responded.id = Some(id);
        responded.status = true;
        responded.response = Some(json!([{"ok": true}]));

        let effects = plan(&command, &responded, &channels);

        assert_eq!(effects.len(), 1);
        let Effect::Produce { topic, payload, .. } = &effects[0] else {
            panic!("reply must use the partitioned transport");
        };
        assert_eq!(topic, "user-event-reply");
        assert_eq!(payload["requestId"], "r1");
        assert_eq!(payload["status"], true);
    }
}
