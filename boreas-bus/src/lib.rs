//! # Boreas Bus
//!
//! Publish/subscribe dispatch engine for the Boreas trading terminal.
//!
//! Components that produce state changes (order execution, market-data
//! ingestion, UI lifecycle) publish typed events instead of calling consumers
//! directly; consumers subscribe by event-type discriminator and are notified
//! asynchronously with at-least-once, best-effort-with-retry delivery.
//!
//! This crate provides:
//! - [`EventBus`] - bounded inbound queue, batch-draining worker pool,
//!   retry worker with exponential backoff, dead-letter ring, statistics
//! - [`SubscriptionRegistry`] - priority-ordered subscriptions per event type
//! - [`EventHandler`] trait with callback, blocking and channel adapters
//! - [`EventPublisher`] - fire-and-continue facade for UI-bound producers
//! - [`EventSystem`] - dependency-injected composition and lifecycle
//!
//! # Architecture
//!
//! ```text
//! Producer ──publish()──▶ ┌────────────────────────────┐
//!                         │  EventBus                  │
//!                         │  (store write)             │
//!                         │  bounded inbound queue     │
//!                         │    │        │              │
//!                         │  worker ─ worker  (batch)  │
//!                         │    │        │              │
//!                         │  subscriptions, priority   │
//!                         │    │                       │
//!                         │  retry queue ─▶ retry task │
//!                         │    │                       │
//!                         │  dead-letter ring          │
//!                         └────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use boreas_bus::{EventSystem, SubscribeOptions, CallbackHandler};
//!
//! let system = EventSystem::initialize(Some(store), config)?;
//! system.bus().subscribe(
//!     "order.filled",
//!     Arc::new(CallbackHandler::new("audit", |event| Ok(()))),
//!     SubscribeOptions::default().with_priority(10),
//! )?;
//! system.publisher().publish(Event::new("order.filled", "order-1", "order", payload))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

mod bus;
mod config;
mod error;
mod handler;
mod publisher;
mod registry;
mod retry;
mod shutdown;
mod stats;
mod system;

pub use bus::EventBus;
pub use config::{BusConfig, SystemConfig};
pub use error::{BatchPublishError, BusError};
pub use handler::{BlockingHandler, CallbackHandler, ChannelHandler, EventHandler, HandlerError};
pub use publisher::EventPublisher;
pub use registry::{SubscribeOptions, Subscription, SubscriptionRegistry};
pub use retry::{DeadLetterEntry, DeadLetterQueue, RetryConfig, RetryPolicy};
pub use stats::BusStatistics;
pub use system::{EventSystem, HealthState, SystemStatus};
