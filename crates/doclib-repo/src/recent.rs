//! Recent-files facade.

use std::sync::Arc;

use doclib_core::{DocumentStore, LiveQuery, RecentFile, Result};

/// Domain-level operations over the recent-files table. No caching of its
/// own; recomputation is the store's job.
pub struct RecentFileRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> RecentFileRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Live list of the most recently opened files.
    pub fn recent_files(&self, limit: i64) -> LiveQuery<Vec<RecentFile>> {
        self.store.recent_files(limit)
    }

    /// Record that a file was opened. Reopening an already-tracked path
    /// replaces its record and access time.
    pub async fn add(&self, file: RecentFile) -> Result<()> {
        self.store.upsert_recent(file).await
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        self.store.remove_recent(path).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear_recents().await
    }
}
