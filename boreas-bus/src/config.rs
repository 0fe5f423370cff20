//! Bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use boreas_core::telemetry::LogConfig;

use crate::retry::RetryConfig;

/// Dispatch engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bounded inbound queue capacity; publishing beyond it fails fast.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Number of concurrent dispatch workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Maximum events collected per worker cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum wait while collecting a batch.
    #[serde(default = "default_batch_timeout", with = "humantime_serde")]
    pub batch_timeout: Duration,
    /// Bounded wait for workers to finish during `stop`.
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
    /// Retry backoff configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Dead-letter ring capacity.
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,
}

fn default_max_queue_size() -> usize {
    1000
}

fn default_worker_count() -> usize {
    4
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_dead_letter_capacity() -> usize {
    1000
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            worker_count: default_worker_count(),
            batch_size: default_batch_size(),
            batch_timeout: default_batch_timeout(),
            shutdown_grace: default_shutdown_grace(),
            retry: RetryConfig::default(),
            dead_letter_capacity: default_dead_letter_capacity(),
        }
    }
}

/// Top-level configuration for a wired event system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Dispatch engine configuration.
    #[serde(default)]
    pub bus: BusConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}
