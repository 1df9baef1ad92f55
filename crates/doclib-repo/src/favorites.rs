//! Favorites facade.

use std::sync::Arc;

use doclib_core::{DocumentStore, FavoriteFile, LiveQuery, Result};

/// Domain-level operations over the favorites table.
pub struct FavoriteRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> FavoriteRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Live list of favorites, most recently added first.
    pub fn all(&self) -> LiveQuery<Vec<FavoriteFile>> {
        self.store.favorites()
    }

    /// Live membership check for a path.
    pub fn is_favorite(&self, path: &str) -> LiveQuery<bool> {
        self.store.is_favorite(path)
    }

    pub async fn add(&self, favorite: FavoriteFile) -> Result<()> {
        self.store.upsert_favorite(favorite).await
    }

    /// Removing a path that was never favorited is a no-op.
    pub async fn remove(&self, path: &str) -> Result<()> {
        self.store.remove_favorite(path).await
    }
}
