//! Event store interface and shared types.

use std::collections::HashMap;

use async_trait::async_trait;

use boreas_core::types::{EventId, Timestamp};
use boreas_core::{Event, ProcessingResult};

/// Store errors.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An event with the same id is already stored.
    #[error("Duplicate event id: {event_id}")]
    DuplicateEvent {
        /// The offending event id.
        event_id: String,
    },

    /// Payload or metadata could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("Migration error: {reason}")]
    Migration {
        /// Reason for the migration failure.
        reason: String,
    },
}

/// Aggregate statistics over the stored event log.
///
/// Computed with aggregate queries on demand, never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStatistics {
    /// Total number of stored events.
    pub total_events: u64,
    /// Number of events marked processed.
    pub processed_events: u64,
    /// Number of events not yet processed.
    pub unprocessed_events: u64,
    /// Number of distinct event types.
    pub distinct_event_types: u64,
    /// Number of distinct (aggregate id, aggregate type) pairs.
    pub distinct_aggregates: u64,
    /// Stored event count per event type.
    pub events_by_type: HashMap<String, u64>,
    /// Occurrence time of the earliest stored event.
    pub earliest_event: Option<Timestamp>,
    /// Occurrence time of the latest stored event.
    pub latest_event: Option<Timestamp>,
}

/// Durable, queryable record of every event and every processing attempt.
///
/// Implementations must tolerate undecodable rows: a stored event whose
/// payload can no longer be deserialized is reported as absent (lookups) or
/// silently filtered (range queries), never surfaced as an error.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Inserts a new event row keyed by the event's id.
    ///
    /// Calling twice with the same id is an application error; the store does
    /// not deduplicate and the second insert fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn store_event(&self, event: &Event) -> Result<EventId, StoreError>;

    /// Looks up an event by primary key.
    ///
    /// Returns `Ok(None)` both for missing rows and for rows that fail to
    /// decode.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError>;

    /// Returns all events for one domain entity in reconstruction order:
    /// occurrence time ascending, then version ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn events_by_aggregate(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>, StoreError>;

    /// Returns up to `limit` events whose processed flag is still false,
    /// oldest first.
    ///
    /// Used for crash-recovery replays; the store performs no replay itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn unprocessed_events(&self, limit: u32) -> Result<Vec<Event>, StoreError>;

    /// Records the outcome of one dispatch attempt.
    ///
    /// Appends a row to the processing log and updates the event row's
    /// processed flag, timestamp and result summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Callers on the dispatch path log
    /// and swallow this error; a store outage must never break delivery.
    async fn mark_processed(
        &self,
        event_id: &EventId,
        result: &ProcessingResult,
    ) -> Result<(), StoreError>;

    /// Computes aggregate statistics over the stored log.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    async fn statistics(&self) -> Result<StoreStatistics, StoreError>;
}
