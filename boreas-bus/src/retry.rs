//! Retry backoff policy and dead-letter queue.
//!
//! A handler failure is retried with exponential backoff up to the
//! subscription's retry budget; exhausted (event, subscription) pairs land in
//! a bounded in-memory dead-letter ring for operator inspection.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use boreas_core::types::Timestamp;
use boreas_core::Event;

/// Retry backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry.
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries.
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier applied per attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    #[serde(default)]
    pub jitter: bool,
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Retry backoff policy.
///
/// With the default configuration the delays form the 1s, 2s, 4s, ...
/// exponential progression, capped at `max_delay`.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a new retry policy with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Calculates the delay for the given attempt number (1-based).
    ///
    /// Attempt 0 is the initial dispatch and has no delay.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let delay_ms = base_delay.min(self.config.max_delay.as_millis() as f64);

        let final_delay = if self.config.jitter {
            // Up to 25% jitter
            delay_ms * (1.0 + rand_jitter() * 0.25)
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0).
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}

/// A permanently failed (event, subscription) pair.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    /// The event whose delivery failed.
    pub event: Event,
    /// Name of the handler that exhausted its retry budget.
    pub handler_name: String,
    /// Total number of invocation attempts, initial dispatch included.
    pub attempts: u32,
    /// Error message from the last failed attempt.
    pub last_error: String,
    /// Time at which the pair was dead-lettered.
    pub dead_lettered_at: Timestamp,
}

/// Bounded in-memory ring of permanently failed deliveries.
///
/// Once full, the oldest entry is evicted to make room. No further automatic
/// action is taken on dead-lettered events.
pub struct DeadLetterQueue {
    entries: RwLock<VecDeque<DeadLetterEntry>>,
    max_size: usize,
    total_dead_lettered: AtomicU64,
}

impl DeadLetterQueue {
    /// Creates a new dead-letter queue with the given maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
            total_dead_lettered: AtomicU64::new(0),
        }
    }

    /// Records a permanently failed delivery.
    pub fn add(
        &self,
        event: Event,
        handler_name: impl Into<String>,
        attempts: u32,
        last_error: impl Into<String>,
    ) {
        let entry = DeadLetterEntry {
            event,
            handler_name: handler_name.into(),
            attempts,
            last_error: last_error.into(),
            dead_lettered_at: Timestamp::now(),
        };

        let mut entries = self.entries.write();
        if entries.len() >= self.max_size {
            if let Some(removed) = entries.pop_front() {
                warn!(
                    event_id = %removed.event.id(),
                    "Dead letter queue full, evicting oldest entry"
                );
            }
        }
        entries.push_back(entry);
        self.total_dead_lettered.fetch_add(1, Ordering::Relaxed);

        debug!(queue_size = entries.len(), "Delivery dead-lettered");
    }

    /// Returns the number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the total number of deliveries ever dead-lettered.
    #[must_use]
    pub fn total_dead_lettered(&self) -> u64 {
        self.total_dead_lettered.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&self) -> Option<DeadLetterEntry> {
        self.entries.write().pop_front()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new(1000)
    }
}
