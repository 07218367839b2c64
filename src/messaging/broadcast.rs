use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

// ============================================================================
// Broadcast transport - fanout pub/sub over Redis
// ============================================================================
//
// Best-effort, many-listener fan-out for sibling services in the same
// datacenter. No delivery acknowledgment, no persistence, no replay: a
// message published while no subscriber is bound is lost. The request /
// response correlation path uses the partitioned transport instead.
//
// ============================================================================

/// Seam for the fanout side of the publisher. Production uses Redis pub/sub;
/// tests swap in an in-memory fake.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    async fn publish(&self, exchange: &str, payload: &str) -> Result<()>;
}

pub struct RedisBroadcast {
    client: redis::Client,
}

impl RedisBroadcast {
    /// One long-lived client per process; reconnection is the client's
    /// responsibility, not the pipeline's.
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    /// Bind to an exchange and forward every received payload into `sink`.
    /// The binding is exclusive to this process and does not survive
    /// restarts; messages published while unbound are lost.
    pub async fn listen(
        &self,
        exchange: &str,
        sink: tokio::sync::mpsc::UnboundedSender<String>,
    ) -> Result<()> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(exchange).await?;
        tracing::info!(exchange, "bound to broadcast exchange");

        let mut messages = pubsub.on_message();
        while let Some(message) = messages.next().await {
            match message.get_payload::<String>() {
                Ok(payload) => {
                    if sink.send(payload).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(exchange, error = %err, "undecodable broadcast payload")
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BroadcastTransport for RedisBroadcast {
    async fn publish(&self, exchange: &str, payload: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let receivers: i64 = conn.publish(exchange, payload).await?;
        tracing::debug!(exchange, receivers, "broadcast published");
        Ok(())
    }
}
