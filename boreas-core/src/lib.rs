//! # Boreas Core
//!
//! Core types and interfaces for the Boreas event bus, the decoupling layer
//! of the Boreas trading terminal.
//!
//! This crate provides:
//! - The immutable [`Event`](event::Event) value type and its metadata envelope
//! - `NewType` wrappers for identifiers and timestamps
//! - [`ProcessingResult`](processing::ProcessingResult) describing one dispatch attempt
//! - Error severity classification and configuration errors
//! - Configuration loading with YAML/TOML/JSON support
//! - Logging bootstrap built on `tracing`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Core type definitions and `NewType` wrappers
pub mod types;

/// The immutable event value type
pub mod event;

/// Dispatch attempt outcomes
pub mod processing;

/// Error severity and configuration errors
pub mod error;

/// Configuration loading
pub mod config;

/// Logging configuration and bootstrap
pub mod telemetry;

pub use event::Event;
pub use processing::ProcessingResult;
pub use types::{EventId, SubscriptionId, Timestamp};
