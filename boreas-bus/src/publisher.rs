//! Publisher facade for UI-bound producers.
//!
//! Producers on a single-threaded UI context need a call that fires and
//! continues. The facade schedules the asynchronous publish on the current
//! runtime and returns immediately; calling it outside a runtime is a
//! programmer error surfaced as [`BusError::NoRuntime`] rather than a
//! silently dropped event.

use tracing::warn;

use boreas_core::Event;

use crate::bus::EventBus;
use crate::error::BusError;

/// Fire-and-continue publishing handle over an [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventPublisher {
    bus: EventBus,
}

impl EventPublisher {
    /// Creates a publisher over the given bus.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Returns the underlying bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Schedules an asynchronous publish of `event` and returns immediately.
    ///
    /// Failures discovered after scheduling (queue full, bus stopped) are
    /// logged at warn level; they are also visible through the bus
    /// statistics.
    ///
    /// # Errors
    ///
    /// Returns `BusError::NoRuntime` when called outside a tokio runtime.
    pub fn publish(&self, event: Event) -> Result<(), BusError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;

        let bus = self.bus.clone();
        handle.spawn(async move {
            let event_id = event.id().clone();
            if let Err(e) = bus.publish(event).await {
                warn!(event_id = %event_id, error = %e, "Scheduled publish failed");
            }
        });

        Ok(())
    }

    /// Schedules an asynchronous publish of each event, in order.
    ///
    /// The batch shares one task, so relative order among these events is
    /// preserved up to the bus queue; a failure stops the remainder of the
    /// batch (logged, prefix already published).
    ///
    /// # Errors
    ///
    /// Returns `BusError::NoRuntime` when called outside a tokio runtime.
    pub fn publish_all(&self, events: Vec<Event>) -> Result<(), BusError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;

        let bus = self.bus.clone();
        handle.spawn(async move {
            if let Err(e) = bus.publish_batch(events).await {
                warn!(error = %e, "Scheduled batch publish stopped early");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::registry::SubscribeOptions;
    use crate::retry::RetryConfig;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_bus() -> EventBus {
        // One worker so delivery order follows queue order in these tests.
        EventBus::new(BusConfig {
            worker_count: 1,
            batch_timeout: Duration::from_millis(20),
            retry: RetryConfig {
                initial_delay: Duration::from_millis(5),
                ..RetryConfig::default()
            },
            ..BusConfig::default()
        })
        .unwrap()
    }

    fn dialog_event() -> Event {
        Event::new("ui.dialog_closed", "settings-dialog", "dialog", json!({}))
    }

    #[tokio::test]
    async fn test_publish_is_fire_and_continue() {
        let bus = fast_bus();
        let (handler, mut receiver) =
            crate::handler::ChannelHandler::with_channel("listener", 4);
        bus.subscribe(
            "ui.dialog_closed",
            Arc::new(handler),
            SubscribeOptions::default(),
        )
        .unwrap();
        bus.start().unwrap();

        let publisher = EventPublisher::new(bus.clone());
        let event = dialog_event();
        let event_id = event.id().clone();
        publisher.publish(event).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.id(), &event_id);
        bus.stop().await;
    }

    #[tokio::test]
    async fn test_publish_all_preserves_order() {
        let bus = fast_bus();
        let (handler, mut receiver) =
            crate::handler::ChannelHandler::with_channel("listener", 8);
        bus.subscribe(
            "ui.dialog_closed",
            Arc::new(handler),
            SubscribeOptions::default(),
        )
        .unwrap();
        bus.start().unwrap();

        let events: Vec<Event> = (0..3).map(|_| dialog_event()).collect();
        let ids: Vec<_> = events.iter().map(|e| e.id().clone()).collect();

        let publisher = EventPublisher::new(bus.clone());
        publisher.publish_all(events).unwrap();

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(
                tokio::time::timeout(Duration::from_secs(5), receiver.recv())
                    .await
                    .unwrap()
                    .unwrap()
                    .id()
                    .clone(),
            );
        }
        assert_eq!(received, ids);
        bus.stop().await;
    }

    #[test]
    fn test_publish_outside_runtime_fails_loudly() {
        let publisher = EventPublisher::new(fast_bus());

        // No runtime on this thread: the call must fail, not drop the event.
        assert_eq!(
            publisher.publish(dialog_event()),
            Err(BusError::NoRuntime)
        );
        assert_eq!(
            publisher.publish_all(vec![dialog_event()]),
            Err(BusError::NoRuntime)
        );
    }
}
