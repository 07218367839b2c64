use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Route table for HTTP-bridge envelopes
// ============================================================================
//
// Envelopes that originate from the HTTP bridge carry a raw path string
// instead of a typed event tag. The known routes are resolved once at
// startup, each holding its compiled matcher, and tried in declaration
// order per message.
//
// ============================================================================

const UUID_PATTERN: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-4[0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoute {
    SignUp,
    UpdatePassword,
}

pub struct RouteTable {
    routes: Vec<(ApiRoute, Regex)>,
}

impl RouteTable {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            routes: vec![
                (ApiRoute::SignUp, Regex::new("^/users/signup$")?),
                (
                    ApiRoute::UpdatePassword,
                    Regex::new(&format!("^/users/{UUID_PATTERN}/password$"))?,
                ),
            ],
        })
    }

    pub fn resolve(&self, path: &str) -> Option<ApiRoute> {
        self.routes
            .iter()
            .find(|(_, pattern)| pattern.is_match(path))
            .map(|(route, _)| *route)
    }
}

/// Shape of an HTTP-bridge envelope. Only the fields the router needs are
/// named; everything else is tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    /// The caller's requestId.
    pub id: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub body: Vec<Value>,
}
