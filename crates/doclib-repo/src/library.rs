//! Composition root.
//!
//! Explicit constructor wiring at process start: one store instance,
//! shared by every facade. No runtime injector.

use std::sync::Arc;

use doclib_core::{LibraryConfig, LibraryStats, Result};
use doclib_store::SqliteStore;

use crate::favorites::FavoriteRepository;
use crate::notes::NoteRepository;
use crate::positions::ReadingPositionRepository;
use crate::recent::RecentFileRepository;
use crate::search::SearchRepository;

/// The assembled document library: one repository facade per entity
/// family, all backed by the same store and therefore the same
/// transaction coordinator and change broker.
pub struct Library {
    store: Arc<SqliteStore>,

    pub recents: RecentFileRepository<SqliteStore>,
    pub favorites: FavoriteRepository<SqliteStore>,
    pub notes: NoteRepository<SqliteStore>,
    pub positions: ReadingPositionRepository<SqliteStore>,
    pub search: SearchRepository<SqliteStore>,
}

impl Library {
    /// Open the library described by the configuration.
    pub fn open(config: &LibraryConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.database.path, &config.database)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    /// Open an in-memory library (for testing).
    pub fn open_memory() -> Result<Self> {
        Ok(Self::with_store(Arc::new(SqliteStore::open_memory()?)))
    }

    /// Wire every facade to an already-open store.
    pub fn with_store(store: Arc<SqliteStore>) -> Self {
        Self {
            recents: RecentFileRepository::new(Arc::clone(&store)),
            favorites: FavoriteRepository::new(Arc::clone(&store)),
            notes: NoteRepository::new(Arc::clone(&store)),
            positions: ReadingPositionRepository::new(Arc::clone(&store)),
            search: SearchRepository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Row counts and storage footprint.
    pub async fn stats(&self) -> Result<LibraryStats> {
        use doclib_core::DocumentStore;
        self.store.stats().await
    }
}
