//! `SQLite` implementation of the event store.
//!
//! Suited to a single-process desktop deployment: the database lives in a
//! local file (or in memory for tests) and is accessed through an async
//! connection pool.

#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, error, warn};

use boreas_core::types::{EventId, Timestamp};
use boreas_core::{Event, ProcessingResult};

use crate::schema::run_migrations;
use crate::store::{EventStore, StoreError, StoreStatistics};

/// `SQLite`-backed event store.
#[derive(Debug, Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Creates a store over an existing pool.
    ///
    /// The caller is responsible for running [`run_migrations`] first.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to a `SQLite` database and ensures the schema exists.
    ///
    /// Use `sqlite:path/to/events.db?mode=rwc` for a file database or
    /// `sqlite::memory:` for an in-memory one. In-memory databases are pinned
    /// to a single connection so every query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        run_migrations(&pool).await?;
        debug!(url, "Event store connected");

        Ok(Self { pool })
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Serializes a value, degrading to a placeholder on failure.
    ///
    /// Durability of the event's occurrence is prioritized over durability of
    /// its full content.
    fn serialize_or_placeholder<T: serde::Serialize>(
        event_id: &EventId,
        what: &str,
        value: &T,
    ) -> String {
        match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                error!(
                    event_id = %event_id,
                    error = %e,
                    "Failed to serialize event {what}; storing placeholder"
                );
                "{}".to_string()
            }
        }
    }

    /// Decodes one row into an event, returning `None` when the stored
    /// payload or metadata is no longer readable.
    fn decode_row(row: &SqliteRow) -> Option<Event> {
        let event_id: String = row.try_get("event_id").ok()?;

        let payload: serde_json::Value =
            match serde_json::from_str(row.try_get::<&str, _>("event_data").ok()?) {
                Ok(value) => value,
                Err(e) => {
                    warn!(event_id, error = %e, "Skipping event with undecodable payload");
                    return None;
                }
            };

        let metadata = match serde_json::from_str(row.try_get::<&str, _>("metadata").ok()?) {
            Ok(value) => value,
            Err(e) => {
                warn!(event_id, error = %e, "Skipping event with undecodable metadata");
                return None;
            }
        };

        Some(Event::from_parts(
            EventId::new(event_id),
            row.try_get::<String, _>("event_type").ok()?,
            row.try_get::<String, _>("aggregate_id").ok()?,
            row.try_get::<String, _>("aggregate_type").ok()?,
            payload,
            metadata,
            row.try_get::<i64, _>("version").ok()? as u32,
            row.try_get::<Option<String>, _>("correlation_id").ok()?,
            row.try_get::<Option<String>, _>("causation_id").ok()?,
            Timestamp::new_unchecked(row.try_get::<i64, _>("occurred_at").ok()?),
        ))
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn store_event(&self, event: &Event) -> Result<EventId, StoreError> {
        let event_data = Self::serialize_or_placeholder(event.id(), "payload", event.payload());
        let metadata = Self::serialize_or_placeholder(event.id(), "metadata", event.metadata());

        sqlx::query(
            "INSERT INTO event_store (
                event_id, event_type, aggregate_id, aggregate_type,
                event_data, metadata, version, correlation_id, causation_id,
                occurred_at, created_at, is_processed
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(event.id().as_str())
        .bind(event.event_type())
        .bind(event.aggregate_id())
        .bind(event.aggregate_type())
        .bind(event_data)
        .bind(metadata)
        .bind(i64::from(event.version()))
        .bind(event.correlation_id())
        .bind(event.causation_id())
        .bind(event.occurred_at().as_millis())
        .bind(Timestamp::now().as_millis())
        .execute(&self.pool)
        .await?;

        debug!(event_id = %event.id(), event_type = %event.event_type(), "Event stored");
        Ok(event.id().clone())
    }

    async fn event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query("SELECT * FROM event_store WHERE event_id = ?")
            .bind(event_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(Self::decode_row))
    }

    async fn events_by_aggregate(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM event_store
             WHERE aggregate_id = ? AND aggregate_type = ?
             ORDER BY occurred_at ASC, version ASC",
        )
        .bind(aggregate_id)
        .bind(aggregate_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(Self::decode_row).collect())
    }

    async fn unprocessed_events(&self, limit: u32) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM event_store
             WHERE is_processed = 0
             ORDER BY occurred_at ASC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(Self::decode_row).collect())
    }

    async fn mark_processed(
        &self,
        event_id: &EventId,
        result: &ProcessingResult,
    ) -> Result<(), StoreError> {
        let summary = serde_json::to_string(result)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO event_processing_log (
                event_id, handler_name, success, error_message,
                processing_time_ms, retry_attempt, processed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event_id.as_str())
        .bind(&result.handler_name)
        .bind(result.success)
        .bind(result.error_message.as_deref())
        .bind(result.processing_time_ms as i64)
        .bind(i64::from(result.retry_attempt))
        .bind(result.processed_at.as_millis())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE event_store
             SET is_processed = 1, processed_at = ?, processing_result = ?
             WHERE event_id = ?",
        )
        .bind(result.processed_at.as_millis())
        .bind(summary)
        .bind(event_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn statistics(&self) -> Result<StoreStatistics, StoreError> {
        let (total, processed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_processed), 0) FROM event_store",
        )
        .fetch_one(&self.pool)
        .await?;

        let (distinct_types, distinct_aggregates): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(DISTINCT event_type),
                    COUNT(DISTINCT aggregate_id || '/' || aggregate_type)
             FROM event_store",
        )
        .fetch_one(&self.pool)
        .await?;

        let per_type: Vec<(String, i64)> = sqlx::query_as(
            "SELECT event_type, COUNT(*) FROM event_store GROUP BY event_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let (earliest, latest): (Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT MIN(occurred_at), MAX(occurred_at) FROM event_store",
        )
        .fetch_one(&self.pool)
        .await?;

        let events_by_type: HashMap<String, u64> = per_type
            .into_iter()
            .map(|(event_type, count)| (event_type, count as u64))
            .collect();

        Ok(StoreStatistics {
            total_events: total as u64,
            processed_events: processed as u64,
            unprocessed_events: (total - processed) as u64,
            distinct_event_types: distinct_types as u64,
            distinct_aggregates: distinct_aggregates as u64,
            events_by_type,
            earliest_event: earliest.map(Timestamp::new_unchecked),
            latest_event: latest.map(Timestamp::new_unchecked),
        })
    }
}
