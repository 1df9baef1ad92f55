//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::Result;
use crate::live::LiveQuery;
use crate::types::{
    FavoriteFile, LibraryStats, Note, ReadingPosition, RecentFile, SearchIndexEntry,
};

/// Storage layer trait.
///
/// Writes are atomic and serialized against each other; each committed
/// write triggers recomputation of every live query whose dependency set
/// it touches. Live reads return a [`LiveQuery`], never a one-shot
/// snapshot.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // Recent files
    async fn upsert_recent(&self, file: RecentFile) -> Result<()>;
    async fn remove_recent(&self, path: &str) -> Result<()>;
    async fn clear_recents(&self) -> Result<()>;
    /// Most recently opened files, `last_accessed` descending, truncated
    /// to `limit` (a non-positive limit yields an empty list).
    fn recent_files(&self, limit: i64) -> LiveQuery<Vec<RecentFile>>;

    // Favorites
    async fn upsert_favorite(&self, file: FavoriteFile) -> Result<()>;
    async fn remove_favorite(&self, path: &str) -> Result<()>;
    async fn clear_favorites(&self) -> Result<()>;
    fn favorites(&self) -> LiveQuery<Vec<FavoriteFile>>;
    fn is_favorite(&self, path: &str) -> LiveQuery<bool>;

    // Notes
    /// Insert (assigning a fresh id when `note.id == 0`) or replace by id.
    /// Returns the persisted id.
    async fn save_note(&self, note: Note) -> Result<i64>;
    async fn remove_note(&self, id: i64) -> Result<()>;
    async fn clear_notes(&self) -> Result<()>;
    fn notes(&self) -> LiveQuery<Vec<Note>>;
    fn note(&self, id: i64) -> LiveQuery<Option<Note>>;

    // Reading positions
    async fn save_position(&self, position: ReadingPosition) -> Result<()>;
    async fn remove_position(&self, path: &str) -> Result<()>;
    async fn clear_positions(&self) -> Result<()>;
    fn position(&self, path: &str) -> LiveQuery<Option<ReadingPosition>>;
    /// At most 5 positions, `last_read_at` descending. The cap is fixed
    /// policy, not configurable.
    fn recent_positions(&self) -> LiveQuery<Vec<ReadingPosition>>;

    // Search index
    async fn index_entry(&self, entry: SearchIndexEntry) -> Result<()>;
    /// Insert a batch of fragments in one transaction. When `replace_path`
    /// is set, all prior fragments for that path are deleted first, in the
    /// same transaction.
    async fn index_entries(
        &self,
        entries: Vec<SearchIndexEntry>,
        replace_path: Option<&str>,
    ) -> Result<()>;
    async fn remove_index(&self, path: &str) -> Result<()>;
    async fn clear_index(&self) -> Result<()>;
    /// Case-sensitive substring match over `content` or `fileName`,
    /// `indexed_at` descending. The empty query matches every row.
    fn search(&self, query: &str) -> LiveQuery<Vec<SearchIndexEntry>>;
    fn index_for_file(&self, path: &str) -> LiveQuery<Vec<SearchIndexEntry>>;

    // Diagnostics
    async fn stats(&self) -> Result<LibraryStats>;
}
