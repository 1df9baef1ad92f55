//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use tokio::sync::mpsc;
use tracing::{debug, info};

use doclib_core::{
    DatabaseConfig, DocumentStore, FavoriteFile, FileKind, LibraryError, LibraryStats, LiveQuery,
    Note, ReadingPosition, RecentFile, Result, SearchIndexEntry, Table, TableSet,
};

use crate::broker::ChangeBroker;
use crate::schema::{schema_identity, META_SCHEMA, SCHEMA, SCHEMA_VERSION};

/// SQLite-based store implementation.
///
/// One connection, shared by every facade and subscription, wrapped in a
/// blocking Mutex: the mutex is the transaction coordinator's
/// serialization point. All SQLite work runs on the blocking thread pool
/// via `spawn_blocking`, so callers never block their own task.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,

    /// Table-change broker driving live-query recomputation.
    broker: Arc<ChangeBroker>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| LibraryError::storage(format!("Failed to open database: {}", e)))?;

        Self::init(conn, config, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LibraryError::storage(format!("Failed to open in-memory database: {}", e)))?;

        Self::init(conn, &DatabaseConfig::default(), Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, config: &DatabaseConfig, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn, config)?;

        // The meta table must exist before the identity check can read it.
        conn.execute_batch(META_SCHEMA)
            .map_err(|e| LibraryError::storage(format!("Failed to create meta table: {}", e)))?;

        Self::check_schema_identity(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| LibraryError::storage(format!("Failed to initialize schema: {}", e)))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            broker: Arc::new(ChangeBroker::new()),
        })
    }

    /// Configure SQLite connection for performance.
    fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
        let journal_mode = if config.wal_mode { "WAL" } else { "DELETE" };
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = {};
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = {};
            PRAGMA busy_timeout = {};
            PRAGMA temp_store = MEMORY;
            "#,
            journal_mode, config.cache_size, config.busy_timeout_ms,
        ))
        .map_err(|e| LibraryError::storage(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Compare the persisted schema identity against this build's, failing
    /// fast on a mismatch. A fresh database records the identity.
    fn check_schema_identity(conn: &Connection) -> Result<()> {
        let expected = schema_identity();

        let found: Option<String> = conn
            .query_row(
                "SELECT value FROM library_meta WHERE key = 'schema_identity'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match found {
            Some(found) if found != expected => Err(LibraryError::SchemaMismatch { expected, found }),
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    "INSERT INTO library_meta (key, value) VALUES ('schema_identity', ?1)",
                    params![expected],
                )
                .map_err(db_err)?;
                conn.execute(
                    "INSERT INTO library_meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION.to_string()],
                )
                .map_err(db_err)?;
                Ok(())
            }
        }
    }

    /// Run a write as one atomic transaction on the blocking pool.
    ///
    /// The connection mutex serializes writers; the touched set is
    /// published inside the critical section, after commit and before the
    /// lock is released, so ticks reach the broker in commit order. On
    /// failure the transaction rolls back and nothing is published.
    async fn write<R, F>(&self, touched: TableSet, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let broker = Arc::clone(&self.broker);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|e| LibraryError::storage(e.to_string()))?;

            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_err)?;
            let result = f(&tx)?;
            tx.commit().map_err(db_err)?;

            broker.publish(touched);
            Ok(result)
        })
        .await
        .map_err(|e| LibraryError::storage(format!("Write task failed: {}", e)))?
    }

    /// Run a read-only operation on the blocking pool. Takes the same
    /// mutex as writers, so it observes only committed state.
    async fn read<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|e| LibraryError::storage(e.to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| LibraryError::storage(format!("Read task failed: {}", e)))?
    }

    /// Register a live query over `deps` and spawn its recompute worker.
    ///
    /// The worker delivers an initial snapshot, then re-runs the query once
    /// per tick from the broker. Recompute errors are delivered to the
    /// subscriber and the worker keeps running.
    fn watch<T, F>(&self, deps: TableSet, query: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn(&Connection) -> Result<T> + Send + Sync + 'static,
    {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (id, mut ticks) = self.broker.subscribe(deps);
        let conn = Arc::clone(&self.conn);
        let broker = Arc::clone(&self.broker);
        let query = Arc::new(query);

        let worker = tokio::spawn(async move {
            let _registration = RegistrationGuard { broker, id };

            let result = run_query(&conn, &query).await;
            if out_tx.send(result).is_err() {
                return;
            }

            while ticks.recv().await.is_some() {
                let result = run_query(&conn, &query).await;
                if out_tx.send(result).is_err() {
                    return;
                }
            }
        });

        LiveQuery::new(out_rx, worker.abort_handle())
    }
}

/// Releases a broker registration when the worker task exits or is
/// aborted.
struct RegistrationGuard {
    broker: Arc<ChangeBroker>,
    id: u64,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.broker.unsubscribe(self.id);
    }
}

/// Execute one recompute of a live query on the blocking pool.
async fn run_query<T, F>(conn: &Arc<Mutex<Connection>>, query: &Arc<F>) -> Result<T>
where
    T: Send + 'static,
    F: Fn(&Connection) -> Result<T> + Send + Sync + 'static,
{
    let conn = Arc::clone(conn);
    let query = Arc::clone(query);

    tokio::task::spawn_blocking(move || {
        let guard = conn.lock().map_err(|e| LibraryError::storage(e.to_string()))?;
        query(&guard)
    })
    .await
    .map_err(|e| LibraryError::storage(format!("Query task failed: {}", e)))?
}

fn db_err(e: rusqlite::Error) -> LibraryError {
    LibraryError::storage(e.to_string())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    // Recent files

    async fn upsert_recent(&self, file: RecentFile) -> Result<()> {
        self.write(TableSet::of(Table::RecentFiles), move |conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO recent_files (path, name, size, lastAccessed, mimeType, type)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    file.path,
                    file.name,
                    file.size,
                    file.last_accessed,
                    file.mime_type,
                    file.file_type.as_str(),
                ],
            )
            .map_err(db_err)?;

            debug!("Upserted recent file: {}", file.path);
            Ok(())
        })
        .await
    }

    async fn remove_recent(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.write(TableSet::of(Table::RecentFiles), move |conn| {
            conn.execute("DELETE FROM recent_files WHERE path = ?1", params![path])
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn clear_recents(&self) -> Result<()> {
        self.write(TableSet::of(Table::RecentFiles), |conn| {
            conn.execute("DELETE FROM recent_files", []).map_err(db_err)?;
            Ok(())
        })
        .await
    }

    fn recent_files(&self, limit: i64) -> LiveQuery<Vec<RecentFile>> {
        self.watch(TableSet::of(Table::RecentFiles), move |conn| {
            if limit <= 0 {
                return Ok(Vec::new());
            }

            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT path, name, size, lastAccessed, mimeType, type
                    FROM recent_files
                    ORDER BY lastAccessed DESC, path ASC
                    LIMIT ?1
                    "#,
                )
                .map_err(db_err)?;

            let files = stmt
                .query_map(params![limit], row_to_recent)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            Ok(files)
        })
    }

    // Favorites

    async fn upsert_favorite(&self, file: FavoriteFile) -> Result<()> {
        self.write(TableSet::of(Table::Favorites), move |conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO favorites (path, name, size, addedAt, mimeType, type)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    file.path,
                    file.name,
                    file.size,
                    file.added_at,
                    file.mime_type,
                    file.file_type.as_str(),
                ],
            )
            .map_err(db_err)?;

            debug!("Upserted favorite: {}", file.path);
            Ok(())
        })
        .await
    }

    async fn remove_favorite(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.write(TableSet::of(Table::Favorites), move |conn| {
            // Zero rows affected is fine; removal of a non-favorite is a no-op.
            conn.execute("DELETE FROM favorites WHERE path = ?1", params![path])
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn clear_favorites(&self) -> Result<()> {
        self.write(TableSet::of(Table::Favorites), |conn| {
            conn.execute("DELETE FROM favorites", []).map_err(db_err)?;
            Ok(())
        })
        .await
    }

    fn favorites(&self) -> LiveQuery<Vec<FavoriteFile>> {
        self.watch(TableSet::of(Table::Favorites), |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT path, name, size, addedAt, mimeType, type
                    FROM favorites
                    ORDER BY addedAt DESC, path ASC
                    "#,
                )
                .map_err(db_err)?;

            let favorites = stmt
                .query_map([], row_to_favorite)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            Ok(favorites)
        })
    }

    fn is_favorite(&self, path: &str) -> LiveQuery<bool> {
        let path = path.to_string();
        self.watch(TableSet::of(Table::Favorites), move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM favorites WHERE path = ?1)",
                    params![path],
                    |row| row.get(0),
                )
                .map_err(db_err)?;

            Ok(exists)
        })
    }

    // Notes

    async fn save_note(&self, note: Note) -> Result<i64> {
        self.write(TableSet::of(Table::Notes), move |conn| {
            if note.id == 0 {
                conn.execute(
                    r#"
                    INSERT INTO notes (title, content, createdAt, modifiedAt, filePath)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        note.title,
                        note.content,
                        note.created_at,
                        note.modified_at,
                        note.file_path,
                    ],
                )
                .map_err(db_err)?;

                let id = conn.last_insert_rowid();
                debug!("Inserted note {}", id);
                Ok(id)
            } else {
                conn.execute(
                    r#"
                    INSERT OR REPLACE INTO notes (id, title, content, createdAt, modifiedAt, filePath)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        note.id,
                        note.title,
                        note.content,
                        note.created_at,
                        note.modified_at,
                        note.file_path,
                    ],
                )
                .map_err(db_err)?;

                Ok(note.id)
            }
        })
        .await
    }

    async fn remove_note(&self, id: i64) -> Result<()> {
        self.write(TableSet::of(Table::Notes), move |conn| {
            conn.execute("DELETE FROM notes WHERE id = ?1", params![id])
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn clear_notes(&self) -> Result<()> {
        self.write(TableSet::of(Table::Notes), |conn| {
            conn.execute("DELETE FROM notes", []).map_err(db_err)?;
            Ok(())
        })
        .await
    }

    fn notes(&self) -> LiveQuery<Vec<Note>> {
        self.watch(TableSet::of(Table::Notes), |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, title, content, createdAt, modifiedAt, filePath
                    FROM notes
                    ORDER BY modifiedAt DESC, id DESC
                    "#,
                )
                .map_err(db_err)?;

            let notes = stmt
                .query_map([], row_to_note)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            Ok(notes)
        })
    }

    fn note(&self, id: i64) -> LiveQuery<Option<Note>> {
        self.watch(TableSet::of(Table::Notes), move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, title, content, createdAt, modifiedAt, filePath
                    FROM notes WHERE id = ?1
                    "#,
                )
                .map_err(db_err)?;

            let note = stmt
                .query_row(params![id], row_to_note)
                .optional()
                .map_err(db_err)?;

            Ok(note)
        })
    }

    // Reading positions

    async fn save_position(&self, position: ReadingPosition) -> Result<()> {
        self.write(TableSet::of(Table::ReadingPositions), move |conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO reading_positions (filePath, pageNumber, scrollOffset, lastReadAt)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    position.file_path,
                    position.page_number,
                    position.scroll_offset,
                    position.last_read_at,
                ],
            )
            .map_err(db_err)?;

            debug!("Saved position for {}", position.file_path);
            Ok(())
        })
        .await
    }

    async fn remove_position(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.write(TableSet::of(Table::ReadingPositions), move |conn| {
            conn.execute(
                "DELETE FROM reading_positions WHERE filePath = ?1",
                params![path],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn clear_positions(&self) -> Result<()> {
        self.write(TableSet::of(Table::ReadingPositions), |conn| {
            conn.execute("DELETE FROM reading_positions", []).map_err(db_err)?;
            Ok(())
        })
        .await
    }

    fn position(&self, path: &str) -> LiveQuery<Option<ReadingPosition>> {
        let path = path.to_string();
        self.watch(TableSet::of(Table::ReadingPositions), move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT filePath, pageNumber, scrollOffset, lastReadAt
                    FROM reading_positions WHERE filePath = ?1
                    "#,
                )
                .map_err(db_err)?;

            let position = stmt
                .query_row(params![path], row_to_position)
                .optional()
                .map_err(db_err)?;

            Ok(position)
        })
    }

    fn recent_positions(&self) -> LiveQuery<Vec<ReadingPosition>> {
        // The 5-row cap is fixed policy.
        self.watch(TableSet::of(Table::ReadingPositions), |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT filePath, pageNumber, scrollOffset, lastReadAt
                    FROM reading_positions
                    ORDER BY lastReadAt DESC, filePath ASC
                    LIMIT 5
                    "#,
                )
                .map_err(db_err)?;

            let positions = stmt
                .query_map([], row_to_position)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            Ok(positions)
        })
    }

    // Search index

    async fn index_entry(&self, entry: SearchIndexEntry) -> Result<()> {
        self.write(TableSet::of(Table::SearchIndex), move |conn| {
            insert_entry(conn, &entry)?;
            Ok(())
        })
        .await
    }

    async fn index_entries(
        &self,
        entries: Vec<SearchIndexEntry>,
        replace_path: Option<&str>,
    ) -> Result<()> {
        let replace_path = replace_path.map(String::from);
        self.write(TableSet::of(Table::SearchIndex), move |conn| {
            if let Some(path) = &replace_path {
                conn.execute("DELETE FROM search_index WHERE filePath = ?1", params![path])
                    .map_err(db_err)?;
            }

            let mut stmt = conn
                .prepare(
                    r#"
                    INSERT INTO search_index (filePath, fileName, content, pageNumber, indexedAt, fileType)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                )
                .map_err(db_err)?;

            for entry in &entries {
                stmt.execute(params![
                    entry.file_path,
                    entry.file_name,
                    entry.content,
                    entry.page_number,
                    entry.indexed_at,
                    entry.file_type.as_str(),
                ])
                .map_err(db_err)?;
            }

            debug!("Indexed {} fragments", entries.len());
            Ok(())
        })
        .await
    }

    async fn remove_index(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.write(TableSet::of(Table::SearchIndex), move |conn| {
            let removed = conn
                .execute("DELETE FROM search_index WHERE filePath = ?1", params![path])
                .map_err(db_err)?;

            debug!("Removed {} fragments for {}", removed, path);
            Ok(())
        })
        .await
    }

    async fn clear_index(&self) -> Result<()> {
        self.write(TableSet::of(Table::SearchIndex), |conn| {
            conn.execute("DELETE FROM search_index", []).map_err(db_err)?;
            Ok(())
        })
        .await
    }

    fn search(&self, query: &str) -> LiveQuery<Vec<SearchIndexEntry>> {
        let query = query.to_string();
        // instr() keeps matching case-sensitive; LIKE would fold ASCII case
        // and treat %/_ as wildcards.
        self.watch(TableSet::of(Table::SearchIndex), move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, filePath, fileName, content, pageNumber, indexedAt, fileType
                    FROM search_index
                    WHERE ?1 = '' OR instr(content, ?1) > 0 OR instr(fileName, ?1) > 0
                    ORDER BY indexedAt DESC, id DESC
                    "#,
                )
                .map_err(db_err)?;

            let entries = stmt
                .query_map(params![query], row_to_entry)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            Ok(entries)
        })
    }

    fn index_for_file(&self, path: &str) -> LiveQuery<Vec<SearchIndexEntry>> {
        let path = path.to_string();
        self.watch(TableSet::of(Table::SearchIndex), move |conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT id, filePath, fileName, content, pageNumber, indexedAt, fileType
                    FROM search_index
                    WHERE filePath = ?1
                    ORDER BY id ASC
                    "#,
                )
                .map_err(db_err)?;

            let entries = stmt
                .query_map(params![path], row_to_entry)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            Ok(entries)
        })
    }

    // Diagnostics

    async fn stats(&self) -> Result<LibraryStats> {
        self.read(|conn| {
            let count = |table: Table| -> Result<u64> {
                conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", table.as_str()),
                    [],
                    |row| row.get(0),
                )
                .map_err(db_err)
            };

            let recent_files = count(Table::RecentFiles)?;
            let favorites = count(Table::Favorites)?;
            let notes = count(Table::Notes)?;
            let reading_positions = count(Table::ReadingPositions)?;
            let search_entries = count(Table::SearchIndex)?;

            let page_count: u64 = conn
                .query_row("PRAGMA page_count", [], |row| row.get(0))
                .unwrap_or(0);
            let page_size: u64 = conn
                .query_row("PRAGMA page_size", [], |row| row.get(0))
                .unwrap_or(4096);

            Ok(LibraryStats {
                recent_files,
                favorites,
                notes,
                reading_positions,
                search_entries,
                storage_bytes: page_count * page_size,
            })
        })
        .await
    }
}

// Row mappers

fn row_to_recent(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecentFile> {
    let kind: String = row.get(5)?;
    Ok(RecentFile {
        path: row.get(0)?,
        name: row.get(1)?,
        size: row.get(2)?,
        last_accessed: row.get(3)?,
        mime_type: row.get(4)?,
        file_type: FileKind::parse(&kind),
    })
}

fn row_to_favorite(row: &rusqlite::Row<'_>) -> rusqlite::Result<FavoriteFile> {
    let kind: String = row.get(5)?;
    Ok(FavoriteFile {
        path: row.get(0)?,
        name: row.get(1)?,
        size: row.get(2)?,
        added_at: row.get(3)?,
        mime_type: row.get(4)?,
        file_type: FileKind::parse(&kind),
    })
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        modified_at: row.get(4)?,
        file_path: row.get(5)?,
    })
}

fn row_to_position(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingPosition> {
    Ok(ReadingPosition {
        file_path: row.get(0)?,
        page_number: row.get(1)?,
        scroll_offset: row.get(2)?,
        last_read_at: row.get(3)?,
    })
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchIndexEntry> {
    let kind: String = row.get(6)?;
    Ok(SearchIndexEntry {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        content: row.get(3)?,
        page_number: row.get(4)?,
        indexed_at: row.get(5)?,
        file_type: FileKind::parse(&kind),
    })
}

fn insert_entry(conn: &Connection, entry: &SearchIndexEntry) -> Result<()> {
    if entry.id == 0 {
        conn.execute(
            r#"
            INSERT INTO search_index (filePath, fileName, content, pageNumber, indexedAt, fileType)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.file_path,
                entry.file_name,
                entry.content,
                entry.page_number,
                entry.indexed_at,
                entry.file_type.as_str(),
            ],
        )
        .map_err(db_err)?;
    } else {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO search_index (id, filePath, fileName, content, pageNumber, indexedAt, fileType)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.id,
                entry.file_path,
                entry.file_name,
                entry.content,
                entry.page_number,
                entry.indexed_at,
                entry.file_type.as_str(),
            ],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn next_ok<T>(query: &mut LiveQuery<T>) -> T {
        query.next().await.expect("subscription ended").expect("recompute failed")
    }

    #[tokio::test]
    async fn test_open_memory() {
        let store = SqliteStore::open_memory().unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.recent_files, 0);
        assert_eq!(stats.search_entries, 0);
        assert!(stats.storage_bytes > 0);
    }

    #[tokio::test]
    async fn test_recent_upsert_replaces() {
        let store = SqliteStore::open_memory().unwrap();

        let mut first = RecentFile::new("/docs/a.pdf", "a.pdf", 100, None);
        first.last_accessed = 1000;
        store.upsert_recent(first).await.unwrap();

        let mut second = RecentFile::new("/docs/a.pdf", "a (renamed).pdf", 200, None);
        second.last_accessed = 2000;
        store.upsert_recent(second.clone()).await.unwrap();

        let mut query = store.recent_files(10);
        let files = next_ok(&mut query).await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], second);
    }

    #[tokio::test]
    async fn test_recent_files_order_and_limit() {
        let store = SqliteStore::open_memory().unwrap();

        for (path, at) in [("/a", 10), ("/b", 30), ("/c", 20)] {
            let mut file = RecentFile::new(path, path, 1, None);
            file.last_accessed = at;
            store.upsert_recent(file).await.unwrap();
        }

        let mut query = store.recent_files(2);
        let files = next_ok(&mut query).await;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/b");
        assert_eq!(files[1].path, "/c");
    }

    #[tokio::test]
    async fn test_recent_files_non_positive_limit() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .upsert_recent(RecentFile::new("/a", "a", 1, None))
            .await
            .unwrap();

        let mut query = store.recent_files(0);
        assert!(next_ok(&mut query).await.is_empty());

        let mut query = store.recent_files(-3);
        assert!(next_ok(&mut query).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_favorite_is_noop() {
        let store = SqliteStore::open_memory().unwrap();
        store.remove_favorite("/never/added.pdf").await.unwrap();

        let mut query = store.favorites();
        assert!(next_ok(&mut query).await.is_empty());
    }

    #[tokio::test]
    async fn test_is_favorite_flips() {
        let store = SqliteStore::open_memory().unwrap();
        let mut query = store.is_favorite("/docs/a.pdf");
        assert!(!next_ok(&mut query).await);

        store
            .upsert_favorite(FavoriteFile::new("/docs/a.pdf", "a.pdf", 1, None))
            .await
            .unwrap();
        assert!(next_ok(&mut query).await);

        store.remove_favorite("/docs/a.pdf").await.unwrap();
        assert!(!next_ok(&mut query).await);
    }

    #[tokio::test]
    async fn test_favorites_ordering() {
        let store = SqliteStore::open_memory().unwrap();

        for (path, at) in [("/x", 5), ("/y", 15), ("/z", 10)] {
            let mut favorite = FavoriteFile::new(path, path, 1, None);
            favorite.added_at = at;
            store.upsert_favorite(favorite).await.unwrap();
        }

        let mut query = store.favorites();
        let favorites = next_ok(&mut query).await;
        let paths: Vec<_> = favorites.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/y", "/z", "/x"]);
    }

    #[tokio::test]
    async fn test_note_insert_and_update() {
        let store = SqliteStore::open_memory().unwrap();

        let note = Note::new("T", "C", Some("/a.pdf"));
        let created_at = note.created_at;
        let id = store.save_note(note).await.unwrap();
        assert!(id > 0);

        let mut query = store.note(id);
        let saved = next_ok(&mut query).await.unwrap();
        assert_eq!(saved.id, id);
        assert_eq!(saved.title, "T");
        assert!(saved.modified_at >= saved.created_at);

        // Updating by id replaces the single row, keeping createdAt.
        let updated = saved.edited("T", "C2");
        let same_id = store.save_note(updated).await.unwrap();
        assert_eq!(same_id, id);

        let note = next_ok(&mut query).await.unwrap();
        assert_eq!(note.content, "C2");
        assert_eq!(note.created_at, created_at);

        let mut all = store.notes();
        assert_eq!(next_ok(&mut all).await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_tables() {
        let store = SqliteStore::open_memory().unwrap();

        store.save_note(Note::new("a", "", None)).await.unwrap();
        store
            .save_position(ReadingPosition::new("/a.pdf", 1, 0.0))
            .await
            .unwrap();

        store.clear_notes().await.unwrap();
        store.clear_positions().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.notes, 0);
        assert_eq!(stats.reading_positions, 0);
    }

    #[tokio::test]
    async fn test_note_ids_are_monotonic() {
        let store = SqliteStore::open_memory().unwrap();

        let a = store.save_note(Note::new("a", "", None)).await.unwrap();
        let b = store.save_note(Note::new("b", "", None)).await.unwrap();
        store.remove_note(b).await.unwrap();
        let c = store.save_note(Note::new("c", "", None)).await.unwrap();

        assert!(b > a);
        assert!(c > b);
    }

    #[tokio::test]
    async fn test_notes_ordered_by_modified_at() {
        let store = SqliteStore::open_memory().unwrap();

        for (title, at) in [("old", 100), ("new", 300), ("mid", 200)] {
            let mut note = Note::new(title, "", None);
            note.modified_at = at;
            store.save_note(note).await.unwrap();
        }

        let mut query = store.notes();
        let notes = next_ok(&mut query).await;
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_position_upsert_and_lookup() {
        let store = SqliteStore::open_memory().unwrap();

        store
            .save_position(ReadingPosition::new("/a.pdf", 3, 0.25))
            .await
            .unwrap();
        store
            .save_position(ReadingPosition::new("/a.pdf", 7, 0.5))
            .await
            .unwrap();

        let mut query = store.position("/a.pdf");
        let position = next_ok(&mut query).await.unwrap();
        assert_eq!(position.page_number, 7);
        assert_eq!(position.scroll_offset, 0.5);

        let mut missing = store.position("/other.pdf");
        assert!(next_ok(&mut missing).await.is_none());
    }

    #[tokio::test]
    async fn test_recent_positions_capped_at_five() {
        let store = SqliteStore::open_memory().unwrap();

        for i in 0..8 {
            let mut position = ReadingPosition::new(&format!("/doc{}.pdf", i), i, 0.0);
            position.last_read_at = i * 100;
            store.save_position(position).await.unwrap();
        }

        let mut query = store.recent_positions();
        let positions = next_ok(&mut query).await;
        assert_eq!(positions.len(), 5);
        assert_eq!(positions[0].file_path, "/doc7.pdf");
        assert_eq!(positions[4].file_path, "/doc3.pdf");
    }

    #[tokio::test]
    async fn test_search_case_sensitive_substring() {
        let store = SqliteStore::open_memory().unwrap();

        store
            .index_entry(SearchIndexEntry::new(
                "/docs/hello.pdf",
                "Hello World",
                Some(1),
                FileKind::Pdf,
            ))
            .await
            .unwrap();

        let mut hits = store.search("lo W");
        assert_eq!(next_ok(&mut hits).await.len(), 1);

        let mut misses = store.search("lo w");
        assert!(next_ok(&mut misses).await.is_empty());

        // File name matches count too.
        let mut by_name = store.search("hello.pdf");
        assert_eq!(next_ok(&mut by_name).await.len(), 1);
    }

    #[tokio::test]
    async fn test_search_empty_query_matches_all() {
        let store = SqliteStore::open_memory().unwrap();

        for i in 0..3 {
            store
                .index_entry(SearchIndexEntry::new(
                    &format!("/doc{}.txt", i),
                    "text",
                    None,
                    FileKind::Text,
                ))
                .await
                .unwrap();
        }

        let mut query = store.search("");
        assert_eq!(next_ok(&mut query).await.len(), 3);
    }

    #[tokio::test]
    async fn test_search_ordered_by_indexed_at() {
        let store = SqliteStore::open_memory().unwrap();

        for (path, at) in [("/old.txt", 100), ("/new.txt", 300), ("/mid.txt", 200)] {
            let mut entry = SearchIndexEntry::new(path, "shared text", None, FileKind::Text);
            entry.indexed_at = at;
            store.index_entry(entry).await.unwrap();
        }

        let mut query = store.search("shared");
        let entries = next_ok(&mut query).await;
        let paths: Vec<_> = entries.iter().map(|e| e.file_path.as_str()).collect();
        assert_eq!(paths, vec!["/new.txt", "/mid.txt", "/old.txt"]);
    }

    #[tokio::test]
    async fn test_bulk_index_and_remove_by_path() {
        let store = SqliteStore::open_memory().unwrap();

        let fragments: Vec<_> = (0..4)
            .map(|page| {
                SearchIndexEntry::new("/book.pdf", &format!("page {}", page), Some(page), FileKind::Pdf)
            })
            .collect();
        store.index_entries(fragments, None).await.unwrap();
        store
            .index_entry(SearchIndexEntry::new("/other.txt", "keep me", None, FileKind::Text))
            .await
            .unwrap();

        let mut book = store.index_for_file("/book.pdf");
        assert_eq!(next_ok(&mut book).await.len(), 4);

        // Deleting by path removes every fragment for that path, nothing else.
        store.remove_index("/book.pdf").await.unwrap();
        assert!(next_ok(&mut book).await.is_empty());

        let mut all = store.search("");
        assert_eq!(next_ok(&mut all).await.len(), 1);
    }

    #[tokio::test]
    async fn test_reindex_replaces_fragments() {
        let store = SqliteStore::open_memory().unwrap();

        let old: Vec<_> = (0..3)
            .map(|p| SearchIndexEntry::new("/book.pdf", "old text", Some(p), FileKind::Pdf))
            .collect();
        store.index_entries(old, None).await.unwrap();

        let new = vec![SearchIndexEntry::new("/book.pdf", "new text", Some(0), FileKind::Pdf)];
        store.index_entries(new, Some("/book.pdf")).await.unwrap();

        let mut query = store.index_for_file("/book.pdf");
        let entries = next_ok(&mut query).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "new text");
    }

    #[tokio::test]
    async fn test_subscription_emits_once_per_relevant_commit() {
        let store = SqliteStore::open_memory().unwrap();

        let mut query = store.favorites();
        assert!(next_ok(&mut query).await.is_empty());

        // A commit touching only another table produces no emission. The
        // broker filters inside the writer's critical section, so by the
        // time the write returns the decision has been made.
        store
            .upsert_recent(RecentFile::new("/a", "a", 1, None))
            .await
            .unwrap();
        assert!(query.try_next().is_none());

        store
            .upsert_favorite(FavoriteFile::new("/a", "a", 1, None))
            .await
            .unwrap();
        assert_eq!(next_ok(&mut query).await.len(), 1);

        // Re-delivery happens even when the result is value-equal.
        store
            .upsert_favorite(FavoriteFile::new("/a", "a", 1, None))
            .await
            .unwrap();
        assert_eq!(next_ok(&mut query).await.len(), 1);
        assert!(query.try_next().is_none());
    }

    #[tokio::test]
    async fn test_cancel_releases_registration() {
        let store = SqliteStore::open_memory().unwrap();

        let mut query = store.favorites();
        assert!(next_ok(&mut query).await.is_empty());
        assert_eq!(store.broker.subscriber_count(), 1);

        query.cancel();
        assert!(query.next().await.is_none());

        store
            .upsert_favorite(FavoriteFile::new("/a", "a", 1, None))
            .await
            .unwrap();
        assert!(query.next().await.is_none());

        // The aborted worker drops its registration.
        for _ in 0..50 {
            if store.broker.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(store.broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_independent_subscriptions() {
        let store = SqliteStore::open_memory().unwrap();

        let mut first = store.favorites();
        let mut second = store.favorites();
        assert!(next_ok(&mut first).await.is_empty());
        assert!(next_ok(&mut second).await.is_empty());

        store
            .upsert_favorite(FavoriteFile::new("/a", "a", 1, None))
            .await
            .unwrap();

        // Each logically identical subscription gets its own delivery.
        assert_eq!(next_ok(&mut first).await.len(), 1);
        assert_eq!(next_ok(&mut second).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes_serialize() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let favorite = FavoriteFile::new("/contested.pdf", "contested.pdf", 1, None);

        let upserter = {
            let store = Arc::clone(&store);
            let favorite = favorite.clone();
            tokio::spawn(async move { store.upsert_favorite(favorite).await })
        };
        let deleter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.remove_favorite("/contested.pdf").await })
        };

        upserter.await.unwrap().unwrap();
        deleter.await.unwrap().unwrap();

        // The outcome must match one of the two serial orderings: either
        // the upsert ran last (row present with its values) or the delete
        // ran last (row absent).
        let mut query = store.favorites();
        let favorites = next_ok(&mut query).await;
        match favorites.len() {
            0 => {}
            1 => assert_eq!(favorites[0], favorite),
            n => panic!("expected at most one row, found {}", n),
        }
    }

    #[tokio::test]
    async fn test_schema_identity_guard() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("library.db");
        let config = DatabaseConfig::default();

        // Fresh database records the identity.
        drop(SqliteStore::open(&db_path, &config).unwrap());

        // Reopening against the matching identity succeeds.
        drop(SqliteStore::open(&db_path, &config).unwrap());

        // Corrupt the stored identity; the store must refuse to open.
        let raw = Connection::open(&db_path).unwrap();
        raw.execute(
            "UPDATE library_meta SET value = 'deadbeef' WHERE key = 'schema_identity'",
            [],
        )
        .unwrap();
        drop(raw);

        match SqliteStore::open(&db_path, &config) {
            Err(LibraryError::SchemaMismatch { found, .. }) => assert_eq!(found, "deadbeef"),
            other => panic!("expected SchemaMismatch, got {:?}", other.map(|_| ())),
        }
    }
}
