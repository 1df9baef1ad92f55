//! Search-index facade.

use std::sync::Arc;

use tracing::info;

use doclib_core::{DocumentStore, FileKind, LiveQuery, Result, SearchIndexEntry};

/// One extracted fragment handed over by the render/indexing collaborator.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Page the text came from, when the format has pages.
    pub page_number: Option<i64>,

    /// Extracted text.
    pub text: String,
}

impl Fragment {
    pub fn new(page_number: Option<i64>, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// Domain-level operations over the search index.
pub struct SearchRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> SearchRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Live substring search over fragment content and file names.
    pub fn search(&self, query: &str) -> LiveQuery<Vec<SearchIndexEntry>> {
        self.store.search(query)
    }

    /// Live list of the fragments indexed for one file.
    pub fn index_for_file(&self, path: &str) -> LiveQuery<Vec<SearchIndexEntry>> {
        self.store.index_for_file(path)
    }

    /// Index a single fragment of a file.
    pub async fn index_fragment(
        &self,
        path: &str,
        text: &str,
        kind: FileKind,
        page_number: Option<i64>,
    ) -> Result<()> {
        let entry = SearchIndexEntry::new(path, text, page_number, kind);
        self.store.index_entry(entry).await
    }

    /// Index a whole document, replacing any fragments previously stored
    /// for its path. All rows are written in one transaction.
    pub async fn index_document(
        &self,
        path: &str,
        fragments: Vec<Fragment>,
        kind: FileKind,
    ) -> Result<()> {
        let entries: Vec<_> = fragments
            .into_iter()
            .map(|f| SearchIndexEntry::new(path, &f.text, f.page_number, kind))
            .collect();

        info!("Indexing {} with {} fragments", path, entries.len());
        self.store.index_entries(entries, Some(path)).await
    }

    /// Drop every fragment indexed for a file.
    pub async fn remove(&self, path: &str) -> Result<()> {
        self.store.remove_index(path).await
    }

    /// Drop the whole index.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear_index().await
    }
}
