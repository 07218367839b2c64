use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// User event commands
// ============================================================================
//
// Immutable value objects carrying exactly the fields their handler needs.
// The dispatcher routes on the variant.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum UserEventCommand {
    /// Register a request envelope for any event kind, optionally fanning the
    /// stored event out to extra topics.
    Add {
        request_id: String,
        event_type: String,
        data: Value,
        targets: Vec<String>,
    },

    /// Register an update-password request and announce it to the sibling
    /// services so they can correlate the eventual response.
    UpdatePassword { request_id: String, data: Value },

    /// Promote the envelope `id` to responded and publish the reply.
    Respond {
        id: Uuid,
        request_id: String,
        event_type: String,
        response: Value,
    },
}

impl UserEventCommand {
    pub fn add(request_id: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        UserEventCommand::Add {
            request_id: request_id.into(),
            event_type: event_type.into(),
            data,
            targets: Vec::new(),
        }
    }

    /// The correlation key this command is tied to.
    pub fn request_id(&self) -> &str {
        match self {
            UserEventCommand::Add { request_id, .. }
            | UserEventCommand::UpdatePassword { request_id, .. }
            | UserEventCommand::Respond { request_id, .. } => request_id,
        }
    }
}
