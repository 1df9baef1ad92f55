//! doclib-repo - Repository facades for the document library
//!
//! Thin, cache-free composition over the storage layer: one facade per
//! entity family, plus the [`Library`] composition root that wires them
//! all to a shared store at process start.

mod favorites;
mod library;
mod notes;
mod positions;
mod recent;
mod search;

pub use favorites::FavoriteRepository;
pub use library::Library;
pub use notes::NoteRepository;
pub use positions::ReadingPositionRepository;
pub use recent::RecentFileRepository;
pub use search::{Fragment, SearchRepository};
