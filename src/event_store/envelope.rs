use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Event Envelope - the persisted unit of the event log
// ============================================================================
//
// An envelope starts life as a "request" (no response, status=false) and is
// promoted at most once to "responded" (response set, status=true). The
// promotion may be driven by a different process than the one that created
// the row, correlated by the caller-supplied requestId.
//
// `data` is opaque to the store; shape validation belongs to the command
// layer before the write.
//
// ============================================================================

/// Wire format is camelCase JSON on both transports. Decoders must tolerate
/// unknown fields, so no deny_unknown_fields here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Assigned by the store at first persistence, immutable afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    /// False until a response has been recorded against this event.
    #[serde(default)]
    pub status: bool,

    /// Caller-supplied correlation key. Never regenerated on update.
    pub request_id: String,

    /// Event kind tag, e.g. "create-user" or "update-user-password".
    #[serde(rename = "type")]
    pub event_type: String,

    /// Opaque payload, any JSON value.
    pub data: Value,

    /// Populated exactly when `status` flips to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    /// Additional destination channels this event must be replicated to.
    /// Older producers emitted the field as "topics".
    #[serde(default, alias = "topics", skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    /// Set at insertion time, never mutated.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Build a request envelope. The store assigns `id` on persistence.
    pub fn request(request_id: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: None,
            status: false,
            request_id: request_id.into(),
            event_type: event_type.into(),
            data,
            response: None,
            targets: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    /// True once a response has been recorded.
    pub fn is_responded(&self) -> bool {
        self.status && self.response.is_some()
    }
}

/// Fields merged into an existing row on the update path. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeUpdate {
    pub status: Option<bool>,
    pub data: Option<Value>,
    pub response: Option<Value>,
}

impl EnvelopeUpdate {
    /// The common case: attach a response and flip status to true.
    pub fn responded(response: Value) -> Self {
        Self {
            status: Some(true),
            data: None,
            response: Some(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_defaults() {
        let envelope = EventEnvelope::request("r1", "create-user", json!([{"username": "alice"}]));

        assert!(envelope.id.is_none());
        assert!(!envelope.status);
        assert_eq!(envelope.request_id, "r1");
        assert_eq!(envelope.event_type, "create-user");
        assert!(envelope.response.is_none());
        assert!(envelope.targets.is_empty());
        assert!(!envelope.is_responded());
    }

    #[test]
    fn test_wire_format_uses_camel_case_and_type_tag() {
        let envelope = EventEnvelope::request("r1", "create-user", json!([]))
            .with_targets(vec!["trip-event".to_string()]);

        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire["requestId"], "r1");
        assert_eq!(wire["type"], "create-user");
        assert_eq!(wire["targets"], json!(["trip-event"]));
        // unset optionals stay off the wire
        assert!(wire.get("id").is_none());
        assert!(wire.get("response").is_none());
    }

    #[test]
    fn test_decode_tolerates_unknown_fields_and_topics_alias() {
        let wire = json!({
            "requestId": "r9",
            "type": "update-user-password",
            "data": [{"password": "secret"}],
            "topics": ["trip-event", "chat-event"],
            "headers": [{"x-extra": "ignored"}],
            "somethingNew": 42
        });

        let envelope: EventEnvelope = serde_json::from_value(wire).unwrap();
        assert_eq!(envelope.request_id, "r9");
        assert_eq!(envelope.targets, vec!["trip-event", "chat-event"]);
        assert!(!envelope.status);
    }

    #[test]
    fn test_responded_update_sets_status_and_response() {
        let update = EnvelopeUpdate::responded(json!([{"ok": true}]));
        assert_eq!(update.status, Some(true));
        assert!(update.data.is_none());
        assert_eq!(update.response, Some(json!([{"ok": true}])));
    }
}
