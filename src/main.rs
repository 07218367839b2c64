use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod audit;
mod config;
mod consumer;
mod correlator;
mod domain;
mod event_store;
mod messaging;
mod utils;

use audit::{AuditKind, AuditStore, AuditTrail, PgAuditStore};
use config::Config;
use consumer::{ReplyListener, RouteTable, UserEventConsumer, UserEventProcessor, UserEventSubscriber};
use correlator::ResponseCorrelator;
use domain::user_events::UserEventHandler;
use event_store::{EventStore, PgEventStore};
use messaging::{EventPublisher, KafkaClient, RedisBroadcast};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,onepiece_events=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(group_id = %config.group_id, "starting user event service");

    // === 1. Relational store + schema bootstrap ===
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let pg_events = PgEventStore::new(pool.clone());
    pg_events.init_schema().await?;
    let event_store: Arc<dyn EventStore> = Arc::new(pg_events);

    let pg_audit = PgAuditStore::new(pool.clone());
    pg_audit.init_schema().await?;
    let audit_store: Arc<dyn AuditStore> = Arc::new(pg_audit);

    // === 2. Transport clients, one long-lived each ===
    let kafka = Arc::new(KafkaClient::new(&config.kafka_brokers)?);
    let broadcast = Arc::new(RedisBroadcast::connect(&config.redis_url)?);
    let publisher = Arc::new(EventPublisher::new(broadcast.clone(), kafka.clone()));

    // === 3. Command layer + correlator ===
    let handler = Arc::new(UserEventHandler::new(
        event_store,
        publisher,
        config.channels.clone(),
    ));
    let correlator = Arc::new(ResponseCorrelator::new(handler.clone()));

    // === 4. Inbound loops ===
    let processor = UserEventProcessor::new(
        RouteTable::new()?,
        handler,
        correlator.clone(),
        AuditTrail::new(AuditKind::User, audit_store.clone()),
    );
    let user_consumer = UserEventConsumer::new(&config, processor)?;
    tokio::spawn(async move {
        if let Err(err) = user_consumer.run().await {
            tracing::error!(error = %err, "user event consumer stopped");
        }
    });

    let subscriber = UserEventSubscriber::new(
        broadcast,
        config.channels.user_exchange.clone(),
        AuditTrail::new(AuditKind::Trip, audit_store.clone()),
        AuditTrail::new(AuditKind::Post, audit_store),
    );
    tokio::spawn(async move {
        if let Err(err) = subscriber.run().await {
            tracing::error!(error = %err, "broadcast subscriber stopped");
        }
    });

    let reply_listener = ReplyListener::new(&config, correlator)?;
    tokio::spawn(async move {
        if let Err(err) = reply_listener.run().await {
            tracing::error!(error = %err, "reply listener stopped");
        }
    });

    tracing::info!("pipeline running, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    // drain in-flight kafka deliveries before exiting
    if let Err(err) = kafka.flush() {
        tracing::error!(error = %err, "producer flush failed on shutdown");
    }
    tracing::info!("shut down");

    Ok(())
}
