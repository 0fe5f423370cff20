//! # Boreas Store
//!
//! Durable, queryable event store for the Boreas event bus.
//!
//! This crate provides:
//! - [`EventStore`] trait for pluggable storage backends
//! - [`SqliteEventStore`] backed by an embedded `SQLite` database
//! - [`MemoryEventStore`] for tests and storeless wiring
//! - Schema management and aggregate statistics queries
//!
//! The store records every event and every processing attempt independently
//! of whether the in-memory bus is running. Store failures never propagate
//! into the dispatch path; callers in the delivery path log and continue.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

mod memory;
mod schema;
mod sqlite;
mod store;

pub use memory::MemoryEventStore;
pub use schema::run_migrations;
pub use sqlite::SqliteEventStore;
pub use store::{EventStore, StoreError, StoreStatistics};
