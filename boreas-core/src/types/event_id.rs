//! Unique event identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for an event.
///
/// Assigned once at event construction and immutable thereafter. Backed by a
/// string so that ids survive serialization boundaries unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates an `EventId` from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique `EventId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = EventId::generate();
        let b = EventId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_str() {
        let id: EventId = "evt-1".into();
        assert_eq!(id.as_str(), "evt-1");
        assert_eq!(format!("{id}"), "evt-1");
    }

    #[test]
    fn test_serde_transparent() {
        let id = EventId::new("evt-2");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"evt-2\"");
        let parsed: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
