//! Database schema definitions.
//!
//! Column names are part of the compatibility surface; renaming or
//! retyping one is a breaking change guarded by the identity hash.

/// Meta table, created before the identity check so the check has
/// somewhere to read from.
pub const META_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS library_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Main schema SQL for initializing the database.
pub const SCHEMA: &str = r#"
-- Recently opened files, one row per path
CREATE TABLE IF NOT EXISTS recent_files (
    path TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    lastAccessed INTEGER NOT NULL,
    mimeType TEXT,
    type TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recent_files_last_accessed ON recent_files(lastAccessed DESC);

-- Favorited files, one row per path
CREATE TABLE IF NOT EXISTS favorites (
    path TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    addedAt INTEGER NOT NULL,
    mimeType TEXT,
    type TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_favorites_added_at ON favorites(addedAt DESC);

-- Free-form notes, optionally linked to a file path
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    createdAt INTEGER NOT NULL,
    modifiedAt INTEGER NOT NULL,
    filePath TEXT
);

CREATE INDEX IF NOT EXISTS idx_notes_modified_at ON notes(modifiedAt DESC);

-- Reading positions, one row per file path
CREATE TABLE IF NOT EXISTS reading_positions (
    filePath TEXT PRIMARY KEY NOT NULL,
    pageNumber INTEGER NOT NULL,
    scrollOffset REAL NOT NULL,
    lastReadAt INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reading_positions_last_read_at ON reading_positions(lastReadAt DESC);

-- Extracted text fragments, many rows per file path
CREATE TABLE IF NOT EXISTS search_index (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filePath TEXT NOT NULL,
    fileName TEXT NOT NULL,
    content TEXT NOT NULL,
    pageNumber INTEGER,
    indexedAt INTEGER NOT NULL,
    fileType TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_index_file_path ON search_index(filePath);
CREATE INDEX IF NOT EXISTS idx_search_index_indexed_at ON search_index(indexedAt DESC);
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;

/// Identity hash of the schema definition, persisted in `library_meta`
/// and compared at open time.
pub fn schema_identity() -> String {
    hex::encode(blake3::hash(SCHEMA.as_bytes()).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_stable() {
        assert_eq!(schema_identity(), schema_identity());
        assert_eq!(schema_identity().len(), 64);
    }
}
