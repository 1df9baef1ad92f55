//! Core domain types for the document library.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Broad file category, detected from MIME type or extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Word,
    Excel,
    PowerPoint,
    Image,
    Video,
    Audio,
    Text,
    Archive,
    Unknown,
}

impl FileKind {
    /// Detect kind from a MIME type string.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/pdf" => Self::Pdf,
            "application/zip" => Self::Archive,
            m if m.starts_with("application/msword")
                || m.starts_with("application/vnd.openxmlformats-officedocument.wordprocessingml") =>
            {
                Self::Word
            }
            m if m.starts_with("application/vnd.ms-excel")
                || m.starts_with("application/vnd.openxmlformats-officedocument.spreadsheetml") =>
            {
                Self::Excel
            }
            m if m.starts_with("application/vnd.ms-powerpoint")
                || m.starts_with("application/vnd.openxmlformats-officedocument.presentationml") =>
            {
                Self::PowerPoint
            }
            m if m.starts_with("image/") => Self::Image,
            m if m.starts_with("video/") => Self::Video,
            m if m.starts_with("audio/") => Self::Audio,
            m if m.starts_with("text/") => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Detect kind from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::Word,
            "xls" | "xlsx" => Self::Excel,
            "ppt" | "pptx" => Self::PowerPoint,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => Self::Image,
            "mp4" | "avi" | "mkv" | "mov" => Self::Video,
            "mp3" | "wav" | "ogg" | "m4a" => Self::Audio,
            "txt" | "md" | "log" => Self::Text,
            "zip" | "rar" | "7z" => Self::Archive,
            _ => Self::Unknown,
        }
    }

    /// Detect kind from a file path, falling back to Unknown.
    pub fn from_path(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => Self::from_extension(ext),
            _ => Self::Unknown,
        }
    }

    /// Column value for the `type`/`fileType` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Excel => "excel",
            Self::PowerPoint => "powerpoint",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Archive => "archive",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a persisted column value back into a kind.
    pub fn parse(value: &str) -> Self {
        match value {
            "pdf" => Self::Pdf,
            "word" => Self::Word,
            "excel" => Self::Excel,
            "powerpoint" => Self::PowerPoint,
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "text" => Self::Text,
            "archive" => Self::Archive,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recently opened file. One row per path; reopening replaces the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFile {
    /// Absolute path, the primary key.
    pub path: String,

    /// Display name.
    pub name: String,

    /// File size in bytes.
    pub size: i64,

    /// Last open time (Unix millis).
    pub last_accessed: i64,

    /// MIME type, when the provider reported one.
    pub mime_type: Option<String>,

    /// Detected file category.
    pub file_type: FileKind,
}

impl RecentFile {
    /// Create a record stamped with the current time.
    pub fn new(path: &str, name: &str, size: i64, mime_type: Option<&str>) -> Self {
        let file_type = mime_type
            .map(FileKind::from_mime)
            .filter(|k| *k != FileKind::Unknown)
            .unwrap_or_else(|| FileKind::from_path(path));

        Self {
            path: path.to_string(),
            name: name.to_string(),
            size,
            last_accessed: now_millis(),
            mime_type: mime_type.map(String::from),
            file_type,
        }
    }
}

/// A favorited file. Presence of the row is the membership fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteFile {
    /// Absolute path, the primary key.
    pub path: String,

    /// Display name.
    pub name: String,

    /// File size in bytes.
    pub size: i64,

    /// Time the file was favorited (Unix millis).
    pub added_at: i64,

    /// MIME type, when known.
    pub mime_type: Option<String>,

    /// Detected file category.
    pub file_type: FileKind,
}

impl FavoriteFile {
    /// Create a record stamped with the current time.
    pub fn new(path: &str, name: &str, size: i64, mime_type: Option<&str>) -> Self {
        let file_type = mime_type
            .map(FileKind::from_mime)
            .filter(|k| *k != FileKind::Unknown)
            .unwrap_or_else(|| FileKind::from_path(path));

        Self {
            path: path.to_string(),
            name: name.to_string(),
            size,
            added_at: now_millis(),
            mime_type: mime_type.map(String::from),
            file_type,
        }
    }
}

/// A free-form note, optionally linked to a file by path.
///
/// `id == 0` means the note has not been persisted yet; the store assigns
/// a monotonic id on first save and the id never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Generated monotonic id (0 until first save).
    pub id: i64,

    /// Note title.
    pub title: String,

    /// Note body.
    pub content: String,

    /// Creation time (Unix millis), immutable after first save.
    pub created_at: i64,

    /// Last modification time (Unix millis).
    pub modified_at: i64,

    /// Non-owning link to a library file; no referential integrity.
    pub file_path: Option<String>,
}

impl Note {
    /// Create an unsaved note stamped with the current time.
    pub fn new(title: &str, content: &str, file_path: Option<&str>) -> Self {
        let now = now_millis();
        Self {
            id: 0,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            modified_at: now,
            file_path: file_path.map(String::from),
        }
    }

    /// Return an edited copy with a fresh modification time.
    pub fn edited(mut self, title: &str, content: &str) -> Self {
        self.title = title.to_string();
        self.content = content.to_string();
        self.modified_at = now_millis();
        self
    }
}

/// Where the reader left off in a file. One row per path; saving replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPosition {
    /// File path, the primary key.
    pub file_path: String,

    /// Zero-based page number.
    pub page_number: i64,

    /// Normalized scroll position within the page (0.0-1.0 by convention).
    pub scroll_offset: f32,

    /// Time the position was saved (Unix millis).
    pub last_read_at: i64,
}

impl ReadingPosition {
    /// Create a position stamped with the current time.
    pub fn new(file_path: &str, page_number: i64, scroll_offset: f32) -> Self {
        Self {
            file_path: file_path.to_string(),
            page_number,
            scroll_offset,
            last_read_at: now_millis(),
        }
    }
}

/// One extracted text fragment of an indexed document.
///
/// A document contributes many entries (typically one per page); they are
/// written in bulk when the file is indexed and removed in bulk by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    /// Generated id (0 until persisted).
    pub id: i64,

    /// Path of the source file.
    pub file_path: String,

    /// Display name of the source file.
    pub file_name: String,

    /// Extracted text.
    pub content: String,

    /// Page the fragment came from, when the format has pages.
    pub page_number: Option<i64>,

    /// Time the fragment was indexed (Unix millis).
    pub indexed_at: i64,

    /// Category of the source file.
    pub file_type: FileKind,
}

impl SearchIndexEntry {
    /// Create an entry stamped with the current time. The file name is the
    /// final path segment.
    pub fn new(file_path: &str, content: &str, page_number: Option<i64>, file_type: FileKind) -> Self {
        let file_name = file_path
            .rsplit('/')
            .next()
            .unwrap_or(file_path)
            .to_string();

        Self {
            id: 0,
            file_path: file_path.to_string(),
            file_name,
            content: content.to_string(),
            page_number,
            indexed_at: now_millis(),
            file_type,
        }
    }
}

/// Row counts and storage footprint of the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryStats {
    /// Number of recent-file rows.
    pub recent_files: u64,

    /// Number of favorite rows.
    pub favorites: u64,

    /// Number of notes.
    pub notes: u64,

    /// Number of reading positions.
    pub reading_positions: u64,

    /// Number of search-index fragments.
    pub search_entries: u64,

    /// Database size in bytes.
    pub storage_bytes: u64,
}
