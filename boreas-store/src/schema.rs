//! `SQLite` schema management.

use sqlx::SqlitePool;

use crate::store::StoreError;

/// DDL statements applied in order. Every statement is idempotent so the
/// migration can run on every startup.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS event_store (
        event_id          TEXT PRIMARY KEY,
        event_type        TEXT NOT NULL,
        aggregate_id      TEXT NOT NULL,
        aggregate_type    TEXT NOT NULL,
        event_data        TEXT NOT NULL,
        metadata          TEXT NOT NULL DEFAULT '{}',
        version           INTEGER NOT NULL DEFAULT 1,
        correlation_id    TEXT,
        causation_id      TEXT,
        occurred_at       INTEGER NOT NULL,
        created_at        INTEGER NOT NULL,
        is_processed      INTEGER NOT NULL DEFAULT 0,
        processed_at      INTEGER,
        processing_result TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_event_store_aggregate
        ON event_store (aggregate_id, aggregate_type)",
    "CREATE INDEX IF NOT EXISTS idx_event_store_type
        ON event_store (event_type)",
    "CREATE INDEX IF NOT EXISTS idx_event_store_occurred_at
        ON event_store (occurred_at)",
    "CREATE INDEX IF NOT EXISTS idx_event_store_unprocessed
        ON event_store (is_processed)",
    "CREATE TABLE IF NOT EXISTS event_processing_log (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id           TEXT NOT NULL REFERENCES event_store (event_id),
        handler_name       TEXT NOT NULL,
        success            INTEGER NOT NULL,
        error_message      TEXT,
        processing_time_ms INTEGER NOT NULL,
        retry_attempt      INTEGER NOT NULL DEFAULT 0,
        processed_at       INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_processing_log_event
        ON event_processing_log (event_id)",
];

/// Creates the event store schema if it does not exist yet.
///
/// # Errors
///
/// Returns `StoreError::Migration` if any DDL statement fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Migration {
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'event%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"event_store"));
        assert!(names.contains(&"event_processing_log"));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }
}
