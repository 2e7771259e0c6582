use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Default content-type tag for clipboard text
pub const DEFAULT_CONTENT_TYPE: &str = "text";

/// Number of characters shown by [`HistoryEntry::preview`]
const PREVIEW_CHARS: usize = 100;

/// Opaque key/value metadata attached to an entry (provenance, original timestamp, ...)
pub type EntryMetadata = BTreeMap<String, serde_json::Value>;

/// A single persisted clipboard history entry
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub content: String,
    pub content_type: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub size: usize,
    pub is_favorite: bool,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

// SECURITY: Custom Debug implementation to prevent clipboard content from leaking into logs
impl std::fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("id", &self.id)
            .field("content", &format!("[REDACTED {} chars]", self.size))
            .field("content_type", &self.content_type)
            .field("content_hash", &self.content_hash)
            .field("created_at", &self.created_at)
            .field("last_seen_at", &self.last_seen_at)
            .field("is_favorite", &self.is_favorite)
            .finish()
    }
}

impl HistoryEntry {
    /// Truncated preview for display
    pub fn preview(&self) -> String {
        preview_of(&self.content)
    }
}

/// Char-boundary safe preview: first 100 characters, `...` appended when truncated
pub fn preview_of(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// A clipboard change observed by the monitor
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardChange {
    pub content: String,
    pub content_type: String,
    pub observed_at: DateTime<Utc>,
    pub size: usize,
}

impl std::fmt::Debug for ClipboardChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardChange")
            .field("content", &format!("[REDACTED {} chars]", self.size))
            .field("content_type", &self.content_type)
            .field("observed_at", &self.observed_at)
            .finish()
    }
}

impl ClipboardChange {
    /// Create a text change observed now
    pub fn new_text(content: String) -> Self {
        Self::new_text_at(content, Utc::now())
    }

    pub fn new_text_at(content: String, observed_at: DateTime<Utc>) -> Self {
        let size = content.chars().count();
        Self {
            content,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            observed_at,
            size,
        }
    }
}

/// Aggregate numbers about the history store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub favorite_count: usize,
    pub today_count: usize,
    /// Size of the backing database file in bytes (0 for in-memory stores)
    pub storage_bytes: u64,
}

impl HistoryStats {
    pub fn storage_mb(&self) -> f64 {
        (self.storage_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

/// Outcome of importing an export file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub touched: usize,
    pub skipped: usize,
}
