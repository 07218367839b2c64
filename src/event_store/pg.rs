use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::envelope::{EnvelopeUpdate, EventEnvelope};
use super::store::{EventStore, StoreError};

// ============================================================================
// Postgres Event Store
// ============================================================================
//
// One row per logical event. The id is generated here, inside the storage
// layer, at first persistence. Updates merge only the supplied fields
// (COALESCE), which keeps requestId and createdAt immutable and makes racing
// response updates last-write-wins on the same row.
//
// ============================================================================

const SELECT_COLUMNS: &str =
    "id, status, request_id, type, data, response, targets, created_at";

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bootstrap the event log table. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_event (
                id UUID PRIMARY KEY,
                status BOOLEAN NOT NULL DEFAULT FALSE,
                request_id VARCHAR NOT NULL,
                type VARCHAR NOT NULL,
                data JSONB NOT NULL,
                response JSONB,
                targets JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> Result<EventEnvelope, StoreError> {
    let map = |err: sqlx::Error| StoreError::Storage(err.to_string());

    let targets: Value = row.try_get("targets").map_err(map)?;
    let targets: Vec<String> = serde_json::from_value(targets)
        .map_err(|err| StoreError::Storage(format!("bad targets column: {err}")))?;

    Ok(EventEnvelope {
        id: Some(row.try_get::<Uuid, _>("id").map_err(map)?),
        status: row.try_get("status").map_err(map)?,
        request_id: row.try_get("request_id").map_err(map)?,
        event_type: row.try_get("type").map_err(map)?,
        data: row.try_get("data").map_err(map)?,
        response: row.try_get("response").map_err(map)?,
        targets,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(map)?,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn register(&self, envelope: EventEnvelope) -> Result<EventEnvelope, StoreError> {
        let id = Uuid::new_v4();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO user_event (id, status, request_id, type, data, response, targets)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SELECT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(envelope.status)
        .bind(&envelope.request_id)
        .bind(&envelope.event_type)
        .bind(&envelope.data)
        .bind(&envelope.response)
        .bind(Json(&envelope.targets))
        .fetch_one(&self.pool)
        .await?;

        decode_row(&row)
    }

    async fn register_update(
        &self,
        id: Uuid,
        update: EnvelopeUpdate,
    ) -> Result<EventEnvelope, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE user_event
               SET status = COALESCE($2, status),
                   data = COALESCE($3, data),
                   response = COALESCE($4, response)
             WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.data)
        .bind(update.response)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => decode_row(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<EventEnvelope>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM user_event WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn all(&self) -> Result<Vec<EventEnvelope>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM user_event ORDER BY created_at",
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}

// Database paths are covered by integration runs against a real Postgres;
// unit tests for store semantics live next to MemoryEventStore.
