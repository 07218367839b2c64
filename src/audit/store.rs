use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::event_store::StoreError;

use super::entry::{AuditAction, AuditEntry, AuditKind};

// ============================================================================
// Audit store - append-only persistence for lifecycle entries
// ============================================================================
//
// No update or delete surface exists on purpose: a written entry is final.
//
// ============================================================================

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(
        &self,
        kind: AuditKind,
        action: AuditAction,
        entity_id: &str,
        version: i32,
        update_alias: Option<String>,
    ) -> Result<AuditEntry, StoreError>;

    /// Entries for one entity in insertion order.
    async fn entries(&self, kind: AuditKind, entity_id: &str) -> Result<Vec<AuditEntry>, StoreError>;
}

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bootstrap the three structurally identical audit tables.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for kind in [AuditKind::User, AuditKind::Trip, AuditKind::Post] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id BIGSERIAL PRIMARY KEY,
                    type VARCHAR NOT NULL,
                    version INT NOT NULL,
                    entity_id VARCHAR NOT NULL,
                    update_alias VARCHAR,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )
                "#,
                table = kind.table()
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> Result<AuditEntry, StoreError> {
    let map = |err: sqlx::Error| StoreError::Storage(err.to_string());

    let action: String = row.try_get("type").map_err(map)?;
    let action = match action.as_str() {
        "CREATE" => AuditAction::Create,
        "UPDATE" => AuditAction::Update,
        "DELETE" => AuditAction::Delete,
        other => return Err(StoreError::Storage(format!("bad audit type: {other}"))),
    };

    Ok(AuditEntry {
        id: row.try_get("id").map_err(map)?,
        action,
        version: row.try_get("version").map_err(map)?,
        entity_id: row.try_get("entity_id").map_err(map)?,
        update_alias: row.try_get("update_alias").map_err(map)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(map)?,
    })
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(
        &self,
        kind: AuditKind,
        action: AuditAction,
        entity_id: &str,
        version: i32,
        update_alias: Option<String>,
    ) -> Result<AuditEntry, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {table} (type, version, entity_id, update_alias)
            VALUES ($1, $2, $3, $4)
            RETURNING id, type, version, entity_id, update_alias, created_at
            "#,
            table = kind.table()
        ))
        .bind(action.as_str())
        .bind(version)
        .bind(entity_id)
        .bind(update_alias)
        .fetch_one(&self.pool)
        .await?;

        decode_row(&row)
    }

    async fn entries(&self, kind: AuditKind, entity_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT id, type, version, entity_id, update_alias, created_at
               FROM {table} WHERE entity_id = $1 ORDER BY id",
            table = kind.table()
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}
