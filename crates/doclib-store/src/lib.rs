//! doclib-store - SQLite storage layer with live queries
//!
//! This crate provides persistent storage for the document library and the
//! table-change broker that recomputes subscribed queries after each
//! committed write.

mod broker;
mod schema;
mod sqlite;

pub use broker::ChangeBroker;
pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::{SCHEMA, SCHEMA_VERSION};
