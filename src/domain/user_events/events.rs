use serde::{Deserialize, Serialize};

// ============================================================================
// User event kinds
// ============================================================================

/// Event tags persisted in the log and carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserEventKind {
    CreateUser,
    UpdateUserPassword,
    UpdateUserAdditionalInfo,
    SoftDeleteUser,
}

impl UserEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserEventKind::CreateUser => "create-user",
            UserEventKind::UpdateUserPassword => "update-user-password",
            UserEventKind::UpdateUserAdditionalInfo => "update-user-additional-info",
            UserEventKind::SoftDeleteUser => "soft-delete-user",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "create-user" => Some(UserEventKind::CreateUser),
            "update-user-password" => Some(UserEventKind::UpdateUserPassword),
            "update-user-additional-info" => Some(UserEventKind::UpdateUserAdditionalInfo),
            "soft-delete-user" => Some(UserEventKind::SoftDeleteUser),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event tags arriving over the broadcast exchange from sibling services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscribedEventKind {
    CreateTrip,
    CreatePost,
}

impl SubscribedEventKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "create-trip" => Some(SubscribedEventKind::CreateTrip),
            "create-post" => Some(SubscribedEventKind::CreatePost),
            _ => None,
        }
    }
}
