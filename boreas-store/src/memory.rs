//! In-memory implementation of the event store.
//!
//! Used by tests and by callers that want fully wired dispatch without a
//! database file. Holds every event for the lifetime of the process.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use boreas_core::types::{EventId, Timestamp};
use boreas_core::{Event, ProcessingResult};

use crate::store::{EventStore, StoreError, StoreStatistics};

struct StoredRecord {
    event: Event,
    is_processed: bool,
}

#[derive(Default)]
struct Inner {
    // Insertion-ordered log; lookups scan, which is fine at test scale.
    records: Vec<StoredRecord>,
    processing_log: Vec<ProcessingResult>,
}

/// In-memory event store.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

impl MemoryEventStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded processing results, oldest first.
    #[must_use]
    pub fn processing_log(&self) -> Vec<ProcessingResult> {
        self.inner.read().processing_log.clone()
    }

    /// Returns the number of stored events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Removes all stored events and processing results.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.records.clear();
        inner.processing_log.clear();
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn store_event(&self, event: &Event) -> Result<EventId, StoreError> {
        let mut inner = self.inner.write();

        if inner.records.iter().any(|r| r.event.id() == event.id()) {
            return Err(StoreError::DuplicateEvent {
                event_id: event.id().to_string(),
            });
        }

        inner.records.push(StoredRecord {
            event: event.clone(),
            is_processed: false,
        });

        Ok(event.id().clone())
    }

    async fn event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .records
            .iter()
            .find(|r| r.event.id() == event_id)
            .map(|r| r.event.clone()))
    }

    async fn events_by_aggregate(
        &self,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read();
        let mut events: Vec<Event> = inner
            .records
            .iter()
            .filter(|r| {
                r.event.aggregate_id() == aggregate_id
                    && r.event.aggregate_type() == aggregate_type
            })
            .map(|r| r.event.clone())
            .collect();

        events.sort_by_key(|e| (e.occurred_at(), e.version()));
        Ok(events)
    }

    async fn unprocessed_events(&self, limit: u32) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read();
        let mut events: Vec<Event> = inner
            .records
            .iter()
            .filter(|r| !r.is_processed)
            .map(|r| r.event.clone())
            .collect();

        events.sort_by_key(Event::occurred_at);
        events.truncate(limit as usize);
        Ok(events)
    }

    async fn mark_processed(
        &self,
        event_id: &EventId,
        result: &ProcessingResult,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        if let Some(record) = inner.records.iter_mut().find(|r| r.event.id() == event_id) {
            record.is_processed = true;
        }
        inner.processing_log.push(result.clone());

        Ok(())
    }

    async fn statistics(&self) -> Result<StoreStatistics, StoreError> {
        let inner = self.inner.read();

        let total = inner.records.len() as u64;
        let processed = inner.records.iter().filter(|r| r.is_processed).count() as u64;

        let mut events_by_type: HashMap<String, u64> = HashMap::new();
        let mut aggregates: HashSet<(String, String)> = HashSet::new();
        let mut earliest: Option<Timestamp> = None;
        let mut latest: Option<Timestamp> = None;

        for record in &inner.records {
            *events_by_type
                .entry(record.event.event_type().to_string())
                .or_insert(0) += 1;
            aggregates.insert((
                record.event.aggregate_id().to_string(),
                record.event.aggregate_type().to_string(),
            ));

            let occurred = record.event.occurred_at();
            earliest = Some(earliest.map_or(occurred, |e| e.min(occurred)));
            latest = Some(latest.map_or(occurred, |l| l.max(occurred)));
        }

        Ok(StoreStatistics {
            total_events: total,
            processed_events: processed,
            unprocessed_events: total - processed,
            distinct_event_types: events_by_type.len() as u64,
            distinct_aggregates: aggregates.len() as u64,
            events_by_type,
            earliest_event: earliest,
            latest_event: latest,
        })
    }
}
