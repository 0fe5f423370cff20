//! The immutable event value type and its metadata envelope.
//!
//! An [`Event`] records a fact that has already happened. It is constructed
//! once by a producer, optionally persisted, read many times by dispatch
//! workers and store queries, and never mutated. Dispatch is keyed on the
//! stable `event_type` string discriminator, never on a runtime type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{EventId, Timestamp};

/// Default payload schema version for newly constructed events.
pub const DEFAULT_EVENT_VERSION: u32 = 1;

/// An immutable record of something that already happened.
///
/// The payload is opaque to the bus; only the envelope fields participate in
/// dispatch and store queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    event_type: String,
    aggregate_id: String,
    aggregate_type: String,
    payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, serde_json::Value>,
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    causation_id: Option<String>,
    occurred_at: Timestamp,
}

impl Event {
    /// Creates a new event with a generated id and the current timestamp.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::generate(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            payload,
            metadata: BTreeMap::new(),
            version: DEFAULT_EVENT_VERSION,
            correlation_id: None,
            causation_id: None,
            occurred_at: Timestamp::now(),
        }
    }

    /// Reconstructs an event from stored parts.
    ///
    /// Used by store backends when reading rows back; producers should use
    /// [`Event::new`].
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: EventId,
        event_type: String,
        aggregate_id: String,
        aggregate_type: String,
        payload: serde_json::Value,
        metadata: BTreeMap<String, serde_json::Value>,
        version: u32,
        correlation_id: Option<String>,
        causation_id: Option<String>,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            id,
            event_type,
            aggregate_id,
            aggregate_type,
            payload,
            metadata,
            version,
            correlation_id,
            causation_id,
            occurred_at,
        }
    }

    /// Sets the payload schema version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the correlation id linking this event to the request that caused it.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the causation id linking this event to the event that caused it.
    #[must_use]
    pub fn with_causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    /// Adds a metadata annotation.
    ///
    /// Metadata is never consulted by the bus for control flow.
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the event id.
    #[must_use]
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Returns the event type discriminator used for subscription matching.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the id of the domain entity this event concerns.
    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    /// Returns the type of the domain entity this event concerns.
    #[must_use]
    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Returns the metadata annotations.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Returns the payload schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the correlation id, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the causation id, if any.
    #[must_use]
    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    /// Returns the time at which the event occurred.
    #[must_use]
    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_filled() -> Event {
        Event::new(
            "order.filled",
            "order-42",
            "order",
            json!({"symbol": "BTC-USDT", "quantity": "0.5", "price": "42000"}),
        )
    }

    #[test]
    fn test_new_assigns_id_and_timestamp() {
        let event = order_filled();
        assert!(!event.id().as_str().is_empty());
        assert!(event.occurred_at().as_millis() > 0);
        assert_eq!(event.version(), DEFAULT_EVENT_VERSION);
    }

    #[test]
    fn test_distinct_events_get_distinct_ids() {
        let a = order_filled();
        let b = order_filled();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_builder_methods() {
        let event = order_filled()
            .with_version(2)
            .with_correlation_id("req-7")
            .with_causation_id("evt-0")
            .with_metadata("source", "gateway");

        assert_eq!(event.version(), 2);
        assert_eq!(event.correlation_id(), Some("req-7"));
        assert_eq!(event.causation_id(), Some("evt-0"));
        assert_eq!(event.metadata().get("source"), Some(&json!("gateway")));
    }

    #[test]
    fn test_serde_roundtrip() {
        let event = order_filled().with_metadata("venue", "binance");
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, event);
        assert_eq!(parsed.event_type(), "order.filled");
        assert_eq!(parsed.aggregate_id(), "order-42");
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let event = order_filled();
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("correlation_id").is_none());
        assert!(json.get("metadata").is_none());
    }
}
