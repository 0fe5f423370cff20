//! Bus error types.

use boreas_core::error::ErrorSeverity;

/// Bus error types.
///
/// Only contract violations the caller can act on immediately are surfaced
/// through these errors; anything discovered during asynchronous processing
/// is recorded as a [`ProcessingResult`](boreas_core::ProcessingResult) and
/// exposed through statistics and the dead-letter queue instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// Publish was called while the bus is stopped.
    #[error("Event bus is not running")]
    NotRunning,

    /// The bounded inbound queue is full.
    ///
    /// Deliberate backpressure signal; the event never entered the queue.
    #[error("Inbound queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Subscribe was called with malformed arguments.
    #[error("Invalid subscription: {reason}")]
    InvalidSubscription {
        /// Why the subscription was rejected.
        reason: String,
    },

    /// The publisher facade was used outside an async runtime.
    #[error("No tokio runtime available; publish must be called from a runtime context")]
    NoRuntime,

    /// The bus configuration is unusable.
    #[error("Invalid bus configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl BusError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::QueueFull { .. } => ErrorSeverity::Recoverable,
            Self::NotRunning
            | Self::InvalidSubscription { .. }
            | Self::NoRuntime
            | Self::InvalidConfig { .. } => ErrorSeverity::Fatal,
        }
    }
}

/// Error returned by a partially completed batch publish.
///
/// The batch is published in order and stops at the first failure; events
/// before `published` were enqueued and stay enqueued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Batch publish stopped after {published} events: {source}")]
pub struct BatchPublishError {
    /// Number of events successfully published before the failure.
    pub published: usize,
    /// The error that stopped the batch.
    #[source]
    pub source: BusError,
}
