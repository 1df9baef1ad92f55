//! doclib-core - Core types and traits for the document library
//!
//! This crate provides the entity types, error taxonomy, live-query
//! primitives, and storage trait used throughout the doclib system.

pub mod config;
pub mod error;
pub mod live;
pub mod tables;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{LibraryError, Result};
pub use live::LiveQuery;
pub use tables::{Table, TableSet};
pub use traits::DocumentStore;
pub use types::*;
