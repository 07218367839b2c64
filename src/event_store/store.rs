use async_trait::async_trait;
use uuid::Uuid;

use super::envelope::{EnvelopeUpdate, EventEnvelope};

// ============================================================================
// Event Store - append-oriented repository for event envelopes
// ============================================================================
//
// Storage failures come back as typed error values rather than panics, so a
// caller can keep committing its own side effects after a failed write and
// decide for itself whether to retry or propagate.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("event {0} not found")]
    NotFound(Uuid),

    #[error("event already exists: {0}")]
    AlreadyExists(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    /// Constraint violations are permanent; everything else is worth a retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Storage(_))
    }
}

impl crate::utils::Transient for StoreError {
    fn is_transient(&self) -> bool {
        StoreError::is_transient(self)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::AlreadyExists(db.message().to_string())
            }
            _ => StoreError::Storage(err.to_string()),
        }
    }
}

/// Repository contract for the event log.
///
/// `register` is the create path: the store generates the id and persists
/// `status=false`. `register_update` merges the supplied fields into an
/// existing row, most commonly to attach a response; it never creates a row
/// for an unknown id.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn register(&self, envelope: EventEnvelope) -> Result<EventEnvelope, StoreError>;

    async fn register_update(
        &self,
        id: Uuid,
        update: EnvelopeUpdate,
    ) -> Result<EventEnvelope, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<EventEnvelope>, StoreError>;

    /// Diagnostics only; rows come back in insertion order.
    async fn all(&self) -> Result<Vec<EventEnvelope>, StoreError>;
}
