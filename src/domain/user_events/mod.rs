// ============================================================================
// User Events Domain
// ============================================================================
//
// Everything specific to the user event log:
// - Event kind tags (events)
// - Commands (immutable value objects)
// - Errors (UserEventError)
// - Effects (pure command -> side-effect planning)
// - Command handler (dispatcher over the store and publisher)
//
// The generic store lives in src/event_store/.
//
// ============================================================================

pub mod command_handler;
pub mod commands;
pub mod effects;
pub mod errors;
pub mod events;

pub use command_handler::UserEventHandler;
pub use commands::UserEventCommand;
pub use effects::{plan, Effect};
pub use errors::UserEventError;
pub use events::{SubscribedEventKind, UserEventKind};
