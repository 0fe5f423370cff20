//! Unique subscription identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a subscription.
///
/// Derived from the event type and the handler name so that a subscriber can
/// unsubscribe without holding onto registry internals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Creates a `SubscriptionId` from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the id for a handler subscribing to an event type.
    #[must_use]
    pub fn derive(event_type: &str, handler_name: &str) -> Self {
        Self(format!("{event_type}::{handler_name}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive() {
        let id = SubscriptionId::derive("order.filled", "risk-monitor");
        assert_eq!(id.as_str(), "order.filled::risk-monitor");
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = SubscriptionId::derive("tick.received", "chart");
        let b = SubscriptionId::derive("tick.received", "chart");
        assert_eq!(a, b);
    }
}
