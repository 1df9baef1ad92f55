//! Notes facade.

use std::sync::Arc;

use doclib_core::{DocumentStore, LiveQuery, Note, Result};

/// Domain-level operations over the notes table.
pub struct NoteRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> NoteRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Live list of all notes, most recently modified first.
    pub fn all(&self) -> LiveQuery<Vec<Note>> {
        self.store.notes()
    }

    /// Live view of a single note by id.
    pub fn note(&self, id: i64) -> LiveQuery<Option<Note>> {
        self.store.note(id)
    }

    /// Save a note, assigning a fresh id when it has none yet. Returns the
    /// persisted id.
    pub async fn save(&self, note: Note) -> Result<i64> {
        self.store.save_note(note).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.remove_note(id).await
    }
}
