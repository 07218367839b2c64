use uuid::Uuid;

use crate::event_store::StoreError;
use crate::utils::Transient;

// ============================================================================
// User event errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserEventError {
    /// Malformed command input, rejected before any write.
    #[error("invalid command: {0}")]
    Validation(String),

    #[error("event {0} not found")]
    NotFound(Uuid),

    #[error("event already registered: {0}")]
    AlreadyExists(String),

    /// Transient storage failure, wrapped so raw store errors never leak
    /// across the event-log boundary.
    #[error("event store failure: {0}")]
    Store(String),
}

impl From<StoreError> for UserEventError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => UserEventError::NotFound(id),
            StoreError::AlreadyExists(detail) => UserEventError::AlreadyExists(detail),
            StoreError::Storage(detail) => UserEventError::Store(detail),
        }
    }
}

impl Transient for UserEventError {
    fn is_transient(&self) -> bool {
        matches!(self, UserEventError::Store(_))
    }
}
