use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};

use crate::utils::{CircuitBreaker, CircuitConfig, CircuitError};

// ============================================================================
// Partitioned transport - keyed, acknowledged delivery over Kafka
// ============================================================================
//
// Messages to the same key land on the same partition in call order. The
// producer batches internally and reports delivery per record; the circuit
// breaker keeps a dead broker from backing up every caller.
//
// ============================================================================

/// Seam for the keyed/topic side of the publisher.
#[async_trait]
pub trait TopicTransport: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()>;
}

pub struct KafkaClient {
    producer: FutureProducer,
    breaker: CircuitBreaker,
}

impl KafkaClient {
    pub fn new(brokers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        let breaker = CircuitBreaker::new(CircuitConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 3,
        });

        Ok(Self { producer, breaker })
    }

    /// Drain in-flight deliveries; called once on process shutdown.
    pub fn flush(&self) -> Result<()> {
        self.producer
            .flush(rdkafka::util::Timeout::After(Duration::from_secs(5)))?;
        Ok(())
    }
}

#[async_trait]
impl TopicTransport for KafkaClient {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()> {
        let result = self
            .breaker
            .call(async {
                let record = FutureRecord::to(topic).key(key).payload(payload);
                self.producer
                    .send(record, rdkafka::util::Timeout::After(Duration::from_secs(5)))
                    .await
                    .map_err(|(err, _)| anyhow::anyhow!("kafka send error: {err}"))?;
                Ok::<(), anyhow::Error>(())
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(topic, key, "published to kafka");
                Ok(())
            }
            Err(CircuitError::Open) => {
                tracing::error!(topic, "circuit open, kafka unavailable");
                Err(anyhow::anyhow!("circuit open for kafka"))
            }
            Err(CircuitError::Inner(err)) => {
                tracing::error!(topic, error = %err, "failed to publish to kafka");
                Err(err)
            }
        }
    }
}
