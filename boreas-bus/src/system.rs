//! Composition and lifecycle management.
//!
//! Wires a store, dispatch engine and publisher into one explicitly
//! constructed, passed-around handle. Lifecycle is owned here; there is no
//! module-level singleton.

#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use boreas_store::EventStore;

use crate::bus::EventBus;
use crate::config::BusConfig;
use crate::error::BusError;
use crate::publisher::EventPublisher;
use crate::stats::BusStatistics;

/// Coarse health classification derived from the bus state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// The bus is running and dispatching.
    Healthy,
    /// The bus is stopped.
    Stopped,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Aggregated system status derived from a statistics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    /// Health classification.
    pub health: HealthState,
    /// Successful invocations per second of uptime.
    pub throughput_per_sec: f64,
    /// Inbound queue fill ratio in `[0, 1]`.
    pub queue_utilization: f64,
    /// The snapshot the status was derived from.
    pub statistics: BusStatistics,
}

/// A fully wired event system: store, dispatch engine, publisher.
#[derive(Debug, Clone)]
pub struct EventSystem {
    bus: EventBus,
    publisher: EventPublisher,
}

impl EventSystem {
    /// Builds store → engine → publisher and starts the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable or no runtime is
    /// available to spawn workers on.
    pub fn initialize(
        store: Option<Arc<dyn EventStore>>,
        config: BusConfig,
    ) -> Result<Self, BusError> {
        let system = Self::build(store, config)?;
        system.bus.start()?;
        info!("Event system initialized and started");
        Ok(system)
    }

    /// Same wiring with the default configuration, without starting.
    ///
    /// The caller controls the lifecycle explicitly via
    /// [`bus()`](Self::bus)`.start()` and [`shutdown`](Self::shutdown).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable.
    pub fn create_simple(store: Option<Arc<dyn EventStore>>) -> Result<Self, BusError> {
        Self::build(store, BusConfig::default())
    }

    fn build(store: Option<Arc<dyn EventStore>>, config: BusConfig) -> Result<Self, BusError> {
        let bus = match store {
            Some(store) => EventBus::with_store(config, store)?,
            None => EventBus::new(config)?,
        };
        let publisher = EventPublisher::new(bus.clone());
        Ok(Self { bus, publisher })
    }

    /// Returns the dispatch engine handle.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns the publisher facade.
    #[must_use]
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Stops the engine, waiting up to `grace` for workers to finish.
    ///
    /// A timeout is logged by the bus and never raised.
    pub async fn shutdown(&self, grace: Duration) {
        self.bus.stop_with_grace(grace).await;
        info!("Event system shut down");
    }

    /// Derives health, throughput and queue utilization from the current
    /// statistics snapshot.
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        let statistics = self.bus.statistics();

        let health = if statistics.running {
            HealthState::Healthy
        } else {
            HealthState::Stopped
        };

        let uptime_secs = statistics.uptime.as_secs_f64();
        let throughput_per_sec = if uptime_secs > 0.0 {
            statistics.processed_count as f64 / uptime_secs
        } else {
            0.0
        };

        let queue_utilization = if statistics.queue_capacity == 0 {
            0.0
        } else {
            statistics.queue_depth as f64 / statistics.queue_capacity as f64
        };

        SystemStatus {
            health,
            throughput_per_sec,
            queue_utilization,
            statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CallbackHandler;
    use crate::registry::SubscribeOptions;
    use boreas_store::MemoryEventStore;
    use serde_json::json;

    fn fast_config() -> BusConfig {
        BusConfig {
            batch_timeout: Duration::from_millis(20),
            ..BusConfig::default()
        }
    }

    #[tokio::test]
    async fn test_initialize_starts_the_bus() {
        let system = EventSystem::initialize(None, fast_config()).unwrap();
        assert!(system.bus().is_running());
        assert_eq!(system.status().health, HealthState::Healthy);

        system.shutdown(Duration::from_secs(1)).await;
        assert!(!system.bus().is_running());
        assert_eq!(system.status().health, HealthState::Stopped);
    }

    #[tokio::test]
    async fn test_create_simple_leaves_lifecycle_to_caller() {
        let system = EventSystem::create_simple(None).unwrap();
        assert!(!system.bus().is_running());

        system.bus().start().unwrap();
        assert!(system.bus().is_running());
        system.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let system = EventSystem::initialize(None, fast_config()).unwrap();
        system.shutdown(Duration::from_secs(1)).await;
        system.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_wired_store_records_published_events() {
        let store = Arc::new(MemoryEventStore::new());
        let system = EventSystem::initialize(
            Some(Arc::clone(&store) as Arc<dyn EventStore>),
            fast_config(),
        )
        .unwrap();

        system
            .bus()
            .subscribe(
                "order.filled",
                Arc::new(CallbackHandler::new("audit", |_event| Ok(()))),
                SubscribeOptions::default(),
            )
            .unwrap();

        let event = boreas_core::Event::new("order.filled", "order-1", "order", json!({}));
        system.bus().publish(event).await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while system.bus().statistics().processed_count < 1 {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        system.shutdown(Duration::from_secs(1)).await;
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_queue_utilization() {
        let system = EventSystem::initialize(None, fast_config()).unwrap();
        let status = system.status();

        assert_eq!(status.queue_utilization, 0.0);
        assert_eq!(status.statistics.queue_capacity, 1000);
        system.shutdown(Duration::from_secs(1)).await;
    }
}
