// ============================================================================
// Consumers - inbound side of both transports
// ============================================================================
//
// Kafka (user-event topic + reply topic) and the broadcast exchange each get
// a long-running loop. Decode failures and unmatched messages are logged
// and dropped; the loops themselves never die on bad input.
//
// ============================================================================

mod reply;
mod routes;
mod subscriber;
mod user_consumer;

pub use reply::ReplyListener;
pub use routes::{ApiEvent, ApiRoute, RouteTable};
pub use subscriber::UserEventSubscriber;
pub use user_consumer::{Disposition, UserEventConsumer, UserEventProcessor};
