//! Reading-positions facade.

use std::sync::Arc;

use doclib_core::{DocumentStore, LiveQuery, ReadingPosition, Result};

/// Domain-level operations over the reading-positions table.
pub struct ReadingPositionRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ReadingPositionRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Live view of the position saved for a file, if any.
    pub fn position(&self, path: &str) -> LiveQuery<Option<ReadingPosition>> {
        self.store.position(path)
    }

    /// Live list of the five most recently read files' positions.
    pub fn recent(&self) -> LiveQuery<Vec<ReadingPosition>> {
        self.store.recent_positions()
    }

    pub async fn save(&self, position: ReadingPosition) -> Result<()> {
        self.store.save_position(position).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.store.remove_position(path).await
    }
}
