//! PostgreSQL outbox.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{OutboxEntry, OutboxStatus, OutboxWriter};

use super::rows::db_err;

pub struct PostgresOutbox {
    pool: PgPool,
    max_attempts: u32,
}

impl PostgresOutbox {
    pub fn new(pool: PgPool, max_attempts: u32) -> Self {
        Self { pool, max_attempts }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    envelope: String,
    status: String,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    attempts: i32,
    last_error: Option<String>,
    partition_key: String,
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = DomainError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let event: EventEnvelope = serde_json::from_str(&row.envelope).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("bad outbox envelope {}: {}", row.id, e),
            )
        })?;

        Ok(OutboxEntry {
            id: row.id,
            event,
            status: row
                .status
                .parse::<OutboxStatus>()
                .map_err(|e| db_err("invalid outbox status", e))?,
            created_at: row.created_at,
            processed_at: row.processed_at,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            last_error: row.last_error,
            partition_key: row.partition_key,
        })
    }
}

/// Inserts one entry on any executor, so billing transactions can share it.
pub(super) async fn insert_entry<'e, E>(executor: E, entry: &OutboxEntry) -> Result<(), DomainError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let envelope = serde_json::to_string(&entry.event).map_err(|e| {
        DomainError::new(ErrorCode::SerializationError, format!("outbox envelope: {}", e))
    })?;

    sqlx::query(
        r#"
        INSERT INTO outbox (
            id, event_id, event_type, partition_key, envelope, status, attempts, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.id)
    .bind(entry.event.event_id.as_str())
    .bind(&entry.event.event_type)
    .bind(&entry.partition_key)
    .bind(envelope)
    .bind(entry.status.as_str())
    .bind(entry.attempts as i32)
    .bind(entry.created_at)
    .execute(executor)
    .await
    .map_err(|e| db_err("Failed to write outbox entry", e))?;

    Ok(())
}

#[async_trait]
impl OutboxWriter for PostgresOutbox {
    async fn write(
        &self,
        event: &EventEnvelope,
        partition_key: &str,
    ) -> Result<OutboxEntry, DomainError> {
        let entry = OutboxEntry::new(event.clone(), partition_key);
        insert_entry(&self.pool, &entry).await?;
        Ok(entry)
    }

    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, envelope, status, created_at, processed_at, attempts, last_error, partition_key
            FROM outbox
            WHERE status = 'pending' OR (status = 'failed' AND attempts < $1)
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(self.max_attempts as i32)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to read outbox", e))?;

        rows.into_iter().map(OutboxEntry::try_from).collect()
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE outbox
            SET status = 'published', processed_at = NOW(), attempts = attempts + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to mark outbox entry published", e))?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE outbox
            SET status = 'failed', processed_at = NOW(), attempts = attempts + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to mark outbox entry failed", e))?;
        Ok(())
    }

    async fn cleanup_old(&self, older_than_hours: u32) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM outbox
            WHERE status = 'published'
              AND processed_at < NOW() - make_interval(hours => $1)
            "#,
        )
        .bind(older_than_hours as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to clean up outbox", e))?;
        Ok(result.rows_affected())
    }
}
