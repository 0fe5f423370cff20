//! Bus statistics.
//!
//! Counter updates from concurrent workers happen under a single mutex so a
//! snapshot is always internally consistent. Snapshots are cheap and safe to
//! take from any context without blocking dispatch.

#![allow(clippy::cast_precision_loss)]

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Snapshot of the bus counters and gauges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusStatistics {
    /// Whether the bus is currently running.
    pub running: bool,
    /// Time since the bus was last started.
    pub uptime: Duration,
    /// Events accepted by `publish` since the last reset.
    pub published_count: u64,
    /// Successful handler invocations since the last reset.
    pub processed_count: u64,
    /// Failed handler invocations since the last reset, retries included.
    pub failed_count: u64,
    /// Average handler invocation time across all attempts.
    pub avg_processing_time_ms: f64,
    /// Events currently waiting in the inbound queue.
    pub queue_depth: usize,
    /// Configured inbound queue capacity.
    pub queue_capacity: usize,
    /// Retry envelopes waiting for their scheduled time.
    pub retry_queue_depth: usize,
    /// Entries currently held in the dead-letter ring.
    pub dead_letter_count: usize,
    /// Total registered subscriptions.
    pub subscription_count: usize,
    /// Configured dispatch worker count.
    pub worker_count: usize,
}

#[derive(Debug, Default)]
struct Counters {
    published: u64,
    processed: u64,
    failed: u64,
    cumulative_processing_ms: u64,
    attempts: u64,
    started_at: Option<Instant>,
}

/// Mutex-guarded counter block shared by all workers.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    counters: Mutex<Counters>,
}

impl StatsRecorder {
    /// Zeroes all counters and stamps the start instant.
    pub(crate) fn reset(&self) {
        let mut counters = self.counters.lock();
        *counters = Counters {
            started_at: Some(Instant::now()),
            ..Counters::default()
        };
    }

    pub(crate) fn record_published(&self) {
        self.counters.lock().published += 1;
    }

    pub(crate) fn record_attempt(&self, success: bool, processing_time_ms: u64) {
        let mut counters = self.counters.lock();
        if success {
            counters.processed += 1;
        } else {
            counters.failed += 1;
        }
        counters.cumulative_processing_ms += processing_time_ms;
        counters.attempts += 1;
    }

    /// Returns (published, processed, failed, average ms, uptime).
    pub(crate) fn snapshot(&self) -> (u64, u64, u64, f64, Duration) {
        let counters = self.counters.lock();
        let avg = if counters.attempts == 0 {
            0.0
        } else {
            counters.cumulative_processing_ms as f64 / counters.attempts as f64
        };
        let uptime = counters
            .started_at
            .map_or(Duration::ZERO, |started| started.elapsed());
        (
            counters.published,
            counters.processed,
            counters.failed,
            avg,
            uptime,
        )
    }
}
