// ============================================================================
// Event Store - envelope model and persistence
// ============================================================================
//
// The append-only record of every event that flows through the pipeline.
// Domain-specific command handling is in src/domain/.
//
// ============================================================================

mod envelope;
mod memory;
mod pg;
mod store;

pub use envelope::{EnvelopeUpdate, EventEnvelope};
pub use memory::MemoryEventStore;
pub use pg::PgEventStore;
pub use store::{EventStore, StoreError};
