use std::sync::Arc;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;

use crate::config::Config;
use crate::correlator::ResponseCorrelator;
use crate::event_store::EventEnvelope;

// ============================================================================
// Reply listener
// ============================================================================
//
// Drains the shared reply topic and matches each envelope to a pending
// waiter by requestId. Replies for requests owned by other processes (or
// already matched / timed out) are dropped after a log line.
//
// ============================================================================

pub struct ReplyListener {
    consumer: StreamConsumer,
    topic: String,
    correlator: Arc<ResponseCorrelator>,
}

impl ReplyListener {
    pub fn new(config: &Config, correlator: Arc<ResponseCorrelator>) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_brokers)
            .set("group.id", format!("{}-reply", config.group_id))
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000")
            .set("auto.offset.reset", "latest")
            .create()?;

        Ok(Self {
            consumer,
            topic: config.channels.reply_topic.clone(),
            correlator,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.consumer.subscribe(&[self.topic.as_str()])?;
        tracing::info!(topic = %self.topic, "reply listener subscribed");

        loop {
            match self.consumer.recv().await {
                Err(err) => tracing::error!(error = %err, "reply consume error"),
                Ok(message) => {
                    let Some(payload) = message.payload() else {
                        continue;
                    };
                    match serde_json::from_slice::<EventEnvelope>(payload) {
                        Ok(envelope) => {
                            self.correlator.complete(envelope).await;
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "undecodable reply, dropped");
                        }
                    }
                }
            }
        }
    }
}
