// ============================================================================
// Messaging - transport clients and the fan-out publisher
// ============================================================================
//
// Two transports side by side: a non-durable fanout broadcast (Redis
// pub/sub) and a keyed, acknowledged topic stream (Kafka). Each process owns
// one long-lived client per transport.
//
// ============================================================================

mod broadcast;
mod kafka;
mod publisher;

pub use broadcast::{BroadcastTransport, RedisBroadcast};
pub use kafka::{KafkaClient, TopicTransport};
pub use publisher::{Destination, EventPublisher};

#[cfg(test)]
pub(crate) use publisher::test_support;
