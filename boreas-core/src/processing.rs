//! Dispatch attempt outcomes.

use serde::{Deserialize, Serialize};

use crate::types::{EventId, Timestamp};

/// Outcome of one dispatch attempt for one (event, subscription) pair.
///
/// Created after every handler invocation, persisted to the event store's
/// processing log, and folded into the bus statistics. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Id of the event that was dispatched.
    pub event_id: EventId,
    /// Name of the handler that was invoked.
    pub handler_name: String,
    /// Whether the handler completed without error.
    pub success: bool,
    /// Error message, present iff the invocation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Wall-clock duration of the invocation in milliseconds.
    pub processing_time_ms: u64,
    /// Retry attempt number; 0 for the first try.
    pub retry_attempt: u32,
    /// Time at which the invocation completed.
    pub processed_at: Timestamp,
}

impl ProcessingResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(
        event_id: EventId,
        handler_name: impl Into<String>,
        processing_time_ms: u64,
        retry_attempt: u32,
    ) -> Self {
        Self {
            event_id,
            handler_name: handler_name.into(),
            success: true,
            error_message: None,
            processing_time_ms,
            retry_attempt,
            processed_at: Timestamp::now(),
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(
        event_id: EventId,
        handler_name: impl Into<String>,
        error_message: impl Into<String>,
        processing_time_ms: u64,
        retry_attempt: u32,
    ) -> Self {
        Self {
            event_id,
            handler_name: handler_name.into(),
            success: false,
            error_message: Some(error_message.into()),
            processing_time_ms,
            retry_attempt,
            processed_at: Timestamp::now(),
        }
    }
}
