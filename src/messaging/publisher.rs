use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use super::broadcast::BroadcastTransport;
use super::kafka::TopicTransport;

// ============================================================================
// Dual-transport publisher
// ============================================================================
//
// One logical event may be replicated to several destinations; each publish
// is independent. A failure on one destination never blocks or rolls back
// the others - the event log already holds the durable record, so a dropped
// publish is observable but not catastrophic.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Fanout exchange on the broadcast transport.
    Exchange(String),
    /// Keyed topic on the partitioned transport.
    Topic(String),
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Exchange(name) => write!(f, "exchange:{name}"),
            Destination::Topic(name) => write!(f, "topic:{name}"),
        }
    }
}

pub struct EventPublisher {
    broadcast: Arc<dyn BroadcastTransport>,
    topics: Arc<dyn TopicTransport>,
}

impl EventPublisher {
    pub fn new(broadcast: Arc<dyn BroadcastTransport>, topics: Arc<dyn TopicTransport>) -> Self {
        Self { broadcast, topics }
    }

    pub async fn publish(&self, payload: &Value, key: &str, destination: &Destination) -> Result<()> {
        let body = payload.to_string();
        match destination {
            Destination::Exchange(exchange) => self.broadcast.publish(exchange, &body).await,
            Destination::Topic(topic) => self.topics.publish(topic, key, &body).await,
        }
    }

    /// Publish to every destination, skipping over failures. Returns how
    /// many destinations were delivered to.
    pub async fn publish_all(
        &self,
        payload: &Value,
        key: &str,
        destinations: &[Destination],
    ) -> usize {
        let mut delivered = 0;
        for destination in destinations {
            match self.publish(payload, key, destination).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::error!(
                        destination = %destination,
                        key,
                        error = %err,
                        "publish failed, destination skipped"
                    );
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Records publishes; destinations listed in `broken` reject.
    #[derive(Default)]
    pub struct FakeTransports {
        pub broadcasts: Mutex<Vec<(String, String)>>,
        pub produced: Mutex<Vec<(String, String, String)>>,
        pub broken: Mutex<Vec<String>>,
    }

    impl FakeTransports {
        pub fn break_destination(&self, name: &str) {
            self.broken.lock().unwrap().push(name.to_string());
        }

        fn check(&self, name: &str) -> Result<()> {
            if self.broken.lock().unwrap().iter().any(|b| b == name) {
                anyhow::bail!("connection refused: {name}");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BroadcastTransport for FakeTransports {
        async fn publish(&self, exchange: &str, payload: &str) -> Result<()> {
            self.check(exchange)?;
            self.broadcasts
                .lock()
                .unwrap()
                .push((exchange.to_string(), payload.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl TopicTransport for FakeTransports {
        async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()> {
            self.check(topic)?;
            self.produced.lock().unwrap().push((
                topic.to_string(),
                key.to_string(),
                payload.to_string(),
            ));
            Ok(())
        }
    }
}
