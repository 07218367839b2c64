// ============================================================================
// Audit - append-only lifecycle trail per tracked entity
// ============================================================================
//
// Distinct from the event log: one CREATE/UPDATE/DELETE row per entity
// transition, written after the primary write committed, never mutated.
//
// ============================================================================

mod entry;
mod memory;
mod store;
mod trail;

pub use entry::{AuditAction, AuditEntry, AuditKind};
pub use memory::MemoryAuditStore;
pub use store::{AuditStore, PgAuditStore};
pub use trail::AuditTrail;
