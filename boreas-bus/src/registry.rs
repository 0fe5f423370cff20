//! In-memory subscription registry.
//!
//! Maps each event-type discriminator to a priority-ordered list of
//! subscriptions. Registry state is never persisted; components re-establish
//! their subscriptions on every process start.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use boreas_core::types::SubscriptionId;

use crate::error::BusError;
use crate::handler::EventHandler;

/// Options accepted by `subscribe`.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeOptions {
    /// Delivery priority; lower values are delivered first among subscribers
    /// of the same event type. Ties are broken by registration order.
    pub priority: u32,
    /// Maximum retry attempts for this subscription's handler on failure.
    pub retry_count: u32,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            priority: 100,
            retry_count: 3,
        }
    }
}

impl SubscribeOptions {
    /// Sets the delivery priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the maximum retry attempts.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// A standing interest in one event type.
pub struct Subscription {
    id: SubscriptionId,
    event_type: String,
    handler: Arc<dyn EventHandler>,
    priority: u32,
    retry_count: u32,
}

impl Subscription {
    /// Returns the subscription id.
    #[must_use]
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Returns the subscribed event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    /// Returns the handler name.
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    /// Returns the delivery priority.
    #[must_use]
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Returns the maximum retry attempts.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

/// Per-event-type, priority-ordered subscription registry.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<String, Vec<Arc<Subscription>>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an event type.
    ///
    /// The new subscription is inserted before the first existing one with a
    /// strictly greater priority value, so equal priorities keep their
    /// registration order.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidSubscription` if the event type or handler
    /// name is empty.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId, BusError> {
        let event_type = event_type.into();
        if event_type.is_empty() {
            return Err(BusError::InvalidSubscription {
                reason: "event type must not be empty".to_string(),
            });
        }
        if handler.name().is_empty() {
            return Err(BusError::InvalidSubscription {
                reason: "handler name must not be empty".to_string(),
            });
        }

        let id = SubscriptionId::derive(&event_type, handler.name());
        let subscription = Arc::new(Subscription {
            id: id.clone(),
            event_type: event_type.clone(),
            handler,
            priority: options.priority,
            retry_count: options.retry_count,
        });

        let mut subscriptions = self.subscriptions.write();
        let entries = subscriptions.entry(event_type.clone()).or_default();
        let position = entries
            .iter()
            .position(|existing| existing.priority > options.priority)
            .unwrap_or(entries.len());
        entries.insert(position, subscription);

        info!(
            subscription_id = %id,
            event_type,
            priority = options.priority,
            "Subscriber registered"
        );

        Ok(id)
    }

    /// Removes the first subscription with the given id.
    ///
    /// Returns whether anything was removed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();

        for entries in subscriptions.values_mut() {
            if let Some(position) = entries.iter().position(|s| s.id() == id) {
                entries.remove(position);
                info!(subscription_id = %id, "Subscriber unregistered");
                return true;
            }
        }

        debug!(subscription_id = %id, "Unsubscribe found no matching subscription");
        false
    }

    /// Returns a snapshot of the subscriptions for an event type, in
    /// delivery order.
    #[must_use]
    pub fn subscriptions_for(&self, event_type: &str) -> Vec<Arc<Subscription>> {
        self.subscriptions
            .read()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the total number of subscriptions across all event types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.read().values().map(Vec::len).sum()
    }

    /// Returns true if no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all subscriptions.
    pub fn clear(&self) {
        self.subscriptions.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CallbackHandler;

    fn noop(name: &str) -> Arc<dyn EventHandler> {
        Arc::new(CallbackHandler::new(name, |_event| Ok(())))
    }

    #[test]
    fn test_subscribe_returns_derived_id() {
        let registry = SubscriptionRegistry::new();
        let id = registry
            .subscribe("order.filled", noop("audit"), SubscribeOptions::default())
            .unwrap();
        assert_eq!(id.as_str(), "order.filled::audit");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_subscribe_rejects_empty_event_type() {
        let registry = SubscriptionRegistry::new();
        let result = registry.subscribe("", noop("audit"), SubscribeOptions::default());
        assert!(matches!(
            result,
            Err(BusError::InvalidSubscription { .. })
        ));
    }

    #[test]
    fn test_priority_ordering_with_stable_ties() {
        let registry = SubscriptionRegistry::new();

        registry
            .subscribe("tick", noop("third"), SubscribeOptions::default().with_priority(20))
            .unwrap();
        registry
            .subscribe("tick", noop("first"), SubscribeOptions::default().with_priority(10))
            .unwrap();
        registry
            .subscribe("tick", noop("second"), SubscribeOptions::default().with_priority(10))
            .unwrap();
        registry
            .subscribe("tick", noop("fourth"), SubscribeOptions::default().with_priority(30))
            .unwrap();

        let names: Vec<String> = registry
            .subscriptions_for("tick")
            .iter()
            .map(|s| s.handler_name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_unsubscribe_removes_first_match() {
        let registry = SubscriptionRegistry::new();
        let id = registry
            .subscribe("tick", noop("chart"), SubscribeOptions::default())
            .unwrap();

        assert!(registry.unsubscribe(&id));
        assert!(registry.is_empty());
        assert!(!registry.unsubscribe(&id));
    }

    #[test]
    fn test_subscriptions_for_unknown_type_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.subscriptions_for("unknown").is_empty());
    }

    #[test]
    fn test_clear() {
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe("tick", noop("chart"), SubscribeOptions::default())
            .unwrap();
        registry
            .subscribe("order.filled", noop("audit"), SubscribeOptions::default())
            .unwrap();

        registry.clear();
        assert!(registry.is_empty());
    }
}
