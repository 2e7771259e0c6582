use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Local, Utc};
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Deserialize;

use super::hasher::content_hash;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{EntryMetadata, HistoryEntry, HistoryStats, ImportSummary, DEFAULT_CONTENT_TYPE};

/// Key: entry id, Value: CBOR-encoded HistoryEntry
const ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("entries");
/// Key: content hash, Value: entry id. Enforces hash uniqueness.
const BY_HASH: TableDefinition<&str, u64> = TableDefinition::new("entries_by_hash");
/// Key: (last_seen_at micros, id). Reverse iteration yields newest first, higher id first on ties.
const BY_RECENCY: TableDefinition<(i64, u64), ()> = TableDefinition::new("entries_by_recency");
const STORE_META: TableDefinition<&str, u64> = TableDefinition::new("store_meta");

const NEXT_ID_KEY: &str = "next_id";

/// Source of "now" for recency and retention
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Record shape accepted by [`HistoryStore::import`]; anything else in the file is ignored
#[derive(Deserialize)]
struct ImportRecord {
    content: String,
    #[serde(default = "default_content_type")]
    content_type: String,
    #[serde(default)]
    is_favorite: bool,
    #[serde(default)]
    metadata: EntryMetadata,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn encode(entry: &HistoryEntry) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(entry, &mut bytes)
        .map_err(|e| AppError::Storage(format!("Serialization error: {}", e)))?;
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> AppResult<HistoryEntry> {
    ciborium::from_reader(bytes)
        .map_err(|e| AppError::Storage(format!("Corrupt entry: {}", e)))
}

fn recency_key(entry: &HistoryEntry) -> (i64, u64) {
    (entry.last_seen_at.timestamp_micros(), entry.id)
}

fn load_entry<T>(entries: &T, id: u64) -> AppResult<Option<HistoryEntry>>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    entries.get(id)?.map(|guard| decode(guard.value())).transpose()
}

/// Persistent, deduplicated clipboard history backed by redb.
///
/// Cheap to clone; clones share the same database. redb admits one write
/// transaction at a time, which serializes upserts; readers see the last
/// committed snapshot and never a partial row.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Database>,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl HistoryStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("Failed to create data directory: {}", e)))?;
        }

        let db = Database::create(path)?;
        Self::init(db, Some(path.to_path_buf()))
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> AppResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db, None)
    }

    /// Open `path`, falling back to an in-memory store if the file cannot be opened
    pub fn open_with_fallback(path: &Path) -> AppResult<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open history database, using in-memory fallback");
                Self::in_memory()
            }
        }
    }

    /// Replace the clock used for timestamps and retention cutoffs
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(db: Database, path: Option<PathBuf>) -> AppResult<Self> {
        // Create every table up front so read transactions never hit a missing table
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(ENTRIES)?;
            write_txn.open_table(BY_HASH)?;
            write_txn.open_table(BY_RECENCY)?;
            write_txn.open_table(STORE_META)?;
        }
        write_txn.commit()?;

        tracing::info!(path = ?path, "History store ready");

        Ok(Self {
            db: Arc::new(db),
            path,
            clock: Arc::new(SystemClock),
        })
    }

    /// Insert `content`, or touch the existing entry with the same digest.
    ///
    /// Returns the stored entry and whether it was newly created. Blank content is
    /// rejected with `InvalidInput` before any write happens.
    pub fn upsert(
        &self,
        content: &str,
        content_type: &str,
        metadata: EntryMetadata,
    ) -> AppResult<(HistoryEntry, bool)> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidInput("content must not be empty".to_string()));
        }

        let hash = content_hash(content);
        let now = self.clock.now();

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut by_hash = write_txn.open_table(BY_HASH)?;
            let mut by_recency = write_txn.open_table(BY_RECENCY)?;

            let existing_id = by_hash.get(hash.as_str())?.map(|guard| guard.value());

            match existing_id {
                Some(id) => {
                    let mut entry = load_entry(&entries, id)?.ok_or_else(|| {
                        AppError::Storage(format!("Hash index points at missing entry {}", id))
                    })?;

                    by_recency.remove(recency_key(&entry))?;
                    entry.last_seen_at = now;
                    entries.insert(id, encode(&entry)?.as_slice())?;
                    by_recency.insert(recency_key(&entry), ())?;

                    (entry, false)
                }
                None => {
                    let mut meta = write_txn.open_table(STORE_META)?;
                    let id = meta.get(NEXT_ID_KEY)?.map(|guard| guard.value()).unwrap_or(1);
                    meta.insert(NEXT_ID_KEY, id + 1)?;

                    let entry = HistoryEntry {
                        id,
                        content: content.to_string(),
                        content_type: content_type.to_string(),
                        content_hash: hash.clone(),
                        created_at: now,
                        last_seen_at: now,
                        size: content.chars().count(),
                        is_favorite: false,
                        metadata,
                    };

                    entries.insert(id, encode(&entry)?.as_slice())?;
                    by_hash.insert(hash.as_str(), id)?;
                    by_recency.insert(recency_key(&entry), ())?;

                    (entry, true)
                }
            }
        };
        write_txn.commit()?;

        tracing::debug!(id = outcome.0.id, is_new = outcome.1, size = outcome.0.size, "Upserted history entry");
        Ok(outcome)
    }

    /// Entries ordered newest `last_seen_at` first; ties broken by higher id first
    pub fn list(&self, limit: usize, offset: usize) -> AppResult<Vec<HistoryEntry>> {
        self.scan_recent(limit, offset, |_| true)
    }

    /// Case-sensitive substring search, same ordering as [`list`](Self::list).
    /// A blank query behaves like `list(limit, 0)`.
    pub fn search(&self, query: &str, limit: usize) -> AppResult<Vec<HistoryEntry>> {
        if query.trim().is_empty() {
            return self.list(limit, 0);
        }
        self.scan_recent(limit, 0, |entry| entry.content.contains(query))
    }

    fn scan_recent<F>(&self, limit: usize, offset: usize, matches: F) -> AppResult<Vec<HistoryEntry>>
    where
        F: Fn(&HistoryEntry) -> bool,
    {
        let mut items = Vec::new();
        if limit == 0 {
            return Ok(items);
        }

        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES)?;
        let by_recency = read_txn.open_table(BY_RECENCY)?;

        let mut skipped = 0;
        for item in by_recency.iter()?.rev() {
            let (key, _) = item?;
            let (_, id) = key.value();

            let Some(entry) = load_entry(&entries, id)? else {
                tracing::warn!(id, "Recency index points at missing entry");
                continue;
            };
            if !matches(&entry) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }

            items.push(entry);
            if items.len() >= limit {
                break;
            }
        }

        Ok(items)
    }

    pub fn get(&self, id: u64) -> AppResult<Option<HistoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES)?;
        load_entry(&entries, id)
    }

    /// Remove an entry. Returns false when no entry has this id.
    pub fn delete(&self, id: u64) -> AppResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut by_hash = write_txn.open_table(BY_HASH)?;
            let mut by_recency = write_txn.open_table(BY_RECENCY)?;

            let removed = entries.remove(id)?.map(|guard| decode(guard.value())).transpose()?;
            if let Some(entry) = &removed {
                by_hash.remove(entry.content_hash.as_str())?;
                by_recency.remove(recency_key(entry))?;
            }
            removed.is_some()
        };
        write_txn.commit()?;

        if removed {
            tracing::debug!(id, "Deleted history entry");
        } else {
            tracing::debug!(id, "No history entry to delete");
        }
        Ok(removed)
    }

    /// Flip the favorite flag. Returns false when no entry has this id.
    pub fn toggle_favorite(&self, id: u64) -> AppResult<bool> {
        self.update_favorite(id, |current| !current)
    }

    /// Set the favorite flag explicitly. Returns false when no entry has this id.
    pub fn set_favorite(&self, id: u64, favorite: bool) -> AppResult<bool> {
        self.update_favorite(id, |_| favorite)
    }

    fn update_favorite<F>(&self, id: u64, next: F) -> AppResult<bool>
    where
        F: FnOnce(bool) -> bool,
    {
        let write_txn = self.db.begin_write()?;
        let found = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            match load_entry(&entries, id)? {
                Some(mut entry) => {
                    entry.is_favorite = next(entry.is_favorite);
                    entries.insert(id, encode(&entry)?.as_slice())?;
                    tracing::debug!(id, favorite = entry.is_favorite, "Updated favorite flag");
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(found)
    }

    /// Retention pass: delete non-favorite entries last seen before `now - older_than`.
    ///
    /// A window reaching past the earliest representable date matches nothing.
    pub fn sweep(&self, older_than: std::time::Duration) -> AppResult<usize> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|window| self.clock.now().checked_sub_signed(window));
        let Some(cutoff) = cutoff else {
            tracing::debug!(?older_than, "Retention window exceeds the date range, nothing to sweep");
            return Ok(0);
        };
        let cutoff_key = (cutoff.timestamp_micros(), 0u64);

        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut entries = write_txn.open_table(ENTRIES)?;
            let mut by_hash = write_txn.open_table(BY_HASH)?;
            let mut by_recency = write_txn.open_table(BY_RECENCY)?;

            let stale: Vec<(i64, u64)> = by_recency
                .range(..cutoff_key)?
                .map(|item| item.map(|(key, _)| key.value()))
                .collect::<Result<_, _>>()?;

            let mut deleted = 0;
            for key in stale {
                let (_, id) = key;
                match load_entry(&entries, id)? {
                    Some(entry) if entry.is_favorite => continue,
                    Some(entry) => {
                        entries.remove(id)?;
                        by_hash.remove(entry.content_hash.as_str())?;
                        by_recency.remove(key)?;
                        deleted += 1;
                    }
                    None => {
                        by_recency.remove(key)?;
                    }
                }
            }
            deleted
        };
        write_txn.commit()?;

        tracing::info!(deleted, cutoff = %cutoff, "Retention sweep finished");
        Ok(deleted)
    }

    /// Remove every entry, favorites included. Ids are not reused afterwards.
    pub fn clear(&self) -> AppResult<usize> {
        let write_txn = self.db.begin_write()?;
        let total = {
            let entries = write_txn.open_table(ENTRIES)?;
            entries.len()? as usize
        };
        write_txn.delete_table(ENTRIES)?;
        write_txn.delete_table(BY_HASH)?;
        write_txn.delete_table(BY_RECENCY)?;
        {
            write_txn.open_table(ENTRIES)?;
            write_txn.open_table(BY_HASH)?;
            write_txn.open_table(BY_RECENCY)?;
        }
        write_txn.commit()?;

        tracing::info!(total, "Cleared clipboard history");
        Ok(total)
    }

    pub fn statistics(&self) -> AppResult<HistoryStats> {
        let today = self.clock.now().with_timezone(&Local).date_naive();

        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES)?;

        let mut stats = HistoryStats {
            total: entries.len()? as usize,
            ..HistoryStats::default()
        };

        for item in entries.iter()? {
            let (_, value) = item?;
            let entry = decode(value.value())?;
            if entry.is_favorite {
                stats.favorite_count += 1;
            }
            if entry.created_at.with_timezone(&Local).date_naive() == today {
                stats.today_count += 1;
            }
        }

        if let Some(path) = &self.path {
            stats.storage_bytes = fs::metadata(path)
                .map_err(|e| AppError::Storage(format!("Failed to stat database file: {}", e)))?
                .len();
        }

        Ok(stats)
    }

    /// Write every entry, newest first, as a pretty-printed JSON array
    pub fn export(&self, path: &Path) -> AppResult<usize> {
        let entries = self.list(usize::MAX, 0)?;

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| AppError::Io(format!("Failed to serialize export: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

        tracing::info!(count = entries.len(), path = %path.display(), "Exported clipboard history");
        Ok(entries.len())
    }

    /// Read an export file and upsert every record, restoring favorites
    pub fn import(&self, path: &Path) -> AppResult<ImportSummary> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let records: Vec<ImportRecord> = serde_json::from_str(&raw)
            .map_err(|e| AppError::InvalidInput(format!("Malformed export file: {}", e)))?;

        let mut summary = ImportSummary::default();
        // Oldest first so relative recency survives the round trip
        for record in records.into_iter().rev() {
            if record.content.trim().is_empty() {
                summary.skipped += 1;
                continue;
            }

            let (entry, is_new) = self.upsert(&record.content, &record.content_type, record.metadata)?;
            if record.is_favorite && !entry.is_favorite {
                self.set_favorite(entry.id, true)?;
            }

            if is_new {
                summary.inserted += 1;
            } else {
                summary.touched += 1;
            }
        }

        tracing::info!(?summary, path = %path.display(), "Imported clipboard history");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store() -> HistoryStore {
        HistoryStore::in_memory().unwrap()
    }

    fn store_with_clock() -> (HistoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
        let store = HistoryStore::in_memory().unwrap().with_clock(clock.clone());
        (store, clock)
    }

    fn add(store: &HistoryStore, content: &str) -> (HistoryEntry, bool) {
        store.upsert(content, "text", EntryMetadata::new()).unwrap()
    }

    fn days(n: u64) -> Duration {
        Duration::from_secs(n * 24 * 60 * 60)
    }

    #[test]
    fn test_upsert_twice_touches() {
        let (store, clock) = store_with_clock();

        let (first, is_new) = add(&store, "hello");
        assert!(is_new);
        assert_eq!(first.size, 5);
        assert_eq!(first.content_hash, content_hash("hello"));

        clock.advance(chrono::Duration::seconds(30));
        let (second, is_new) = add(&store, "hello");
        assert!(!is_new);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_seen_at > first.last_seen_at);

        assert_eq!(store.list(10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_touch_moves_entry_to_front() {
        let (store, clock) = store_with_clock();
        let (a, _) = add(&store, "alpha");
        clock.advance(chrono::Duration::seconds(1));
        add(&store, "beta");
        clock.advance(chrono::Duration::seconds(1));
        add(&store, "alpha");

        let items = store.list(10, 0).unwrap();
        assert_eq!(items[0].id, a.id);
        assert_eq!(items[1].content, "beta");
    }

    #[test]
    fn test_blank_content_rejected() {
        let store = store();
        for blank in ["", "   ", "\n\t "] {
            let err = store.upsert(blank, "text", EntryMetadata::new()).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
        assert_eq!(store.statistics().unwrap().total, 0);
    }

    #[test]
    fn test_concurrent_identical_upserts_create_one_row() {
        let store = store();
        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.upsert("same content", "text", EntryMetadata::new()).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|(_, is_new)| *is_new).count(), 1);
        let first_id = results[0].0.id;
        assert!(results.iter().all(|(entry, _)| entry.id == first_id));
        assert_eq!(store.list(100, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_equal_timestamps_order_by_id_desc() {
        let (store, _clock) = store_with_clock();
        let (a, _) = add(&store, "first");
        let (b, _) = add(&store, "second");
        let (c, _) = add(&store, "third");
        assert_eq!(a.last_seen_at, c.last_seen_at);

        let ids: Vec<u64> = store.list(10, 0).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn test_list_limit_and_offset() {
        let (store, clock) = store_with_clock();
        for i in 0..5 {
            add(&store, &format!("item {}", i));
            clock.advance(chrono::Duration::seconds(1));
        }

        let page: Vec<String> = store.list(2, 1).unwrap().into_iter().map(|e| e.content).collect();
        assert_eq!(page, vec!["item 3", "item 2"]);
        assert!(store.list(0, 0).unwrap().is_empty());
        assert!(store.list(10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_substring() {
        let (store, clock) = store_with_clock();
        add(&store, "hello world");
        clock.advance(chrono::Duration::seconds(1));
        add(&store, "goodbye");

        let hits = store.search("hello", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "hello world");

        // Case-sensitive
        assert!(store.search("Hello", 10).unwrap().is_empty());

        let all: Vec<String> = store.search("", 10).unwrap().into_iter().map(|e| e.content).collect();
        assert_eq!(all, vec!["goodbye", "hello world"]);
    }

    #[test]
    fn test_delete() {
        let store = store();
        let (entry, _) = add(&store, "to delete");

        assert!(store.delete(entry.id).unwrap());
        assert!(!store.delete(entry.id).unwrap());
        assert!(store.get(entry.id).unwrap().is_none());

        // Hash index cleared: same content is a fresh insert with a new id
        let (again, is_new) = add(&store, "to delete");
        assert!(is_new);
        assert!(again.id > entry.id);
    }

    #[test]
    fn test_toggle_favorite() {
        let store = store();
        let (entry, _) = add(&store, "keep me");

        assert!(store.toggle_favorite(entry.id).unwrap());
        assert!(store.get(entry.id).unwrap().unwrap().is_favorite);
        assert!(store.toggle_favorite(entry.id).unwrap());
        assert!(!store.get(entry.id).unwrap().unwrap().is_favorite);
        assert!(!store.toggle_favorite(9999).unwrap());
    }

    #[test]
    fn test_sweep_keeps_favorites() {
        let (store, clock) = store_with_clock();
        let (a, _) = add(&store, "favorite");
        let (b, _) = add(&store, "ordinary");
        store.toggle_favorite(a.id).unwrap();

        clock.advance(chrono::Duration::days(100));
        let (c, _) = add(&store, "recent");

        assert_eq!(store.sweep(days(30)).unwrap(), 1);
        assert!(store.get(a.id).unwrap().is_some());
        assert!(store.get(b.id).unwrap().is_none());
        assert!(store.get(c.id).unwrap().is_some());

        assert_eq!(store.sweep(days(30)).unwrap(), 0);
    }

    #[test]
    fn test_sweep_cutoff_is_exclusive() {
        let (store, clock) = store_with_clock();
        let (entry, _) = add(&store, "on the boundary");

        clock.advance(chrono::Duration::days(30));
        assert_eq!(store.sweep(days(30)).unwrap(), 0);
        assert!(store.get(entry.id).unwrap().is_some());

        clock.advance(chrono::Duration::microseconds(1));
        assert_eq!(store.sweep(days(30)).unwrap(), 1);
        assert!(store.get(entry.id).unwrap().is_none());
    }

    #[test]
    fn test_sweep_with_huge_window_removes_nothing() {
        let (store, _clock) = store_with_clock();
        add(&store, "ancient history");

        assert_eq!(store.sweep(Duration::from_secs(u64::MAX / 2)).unwrap(), 0);
        assert_eq!(store.sweep(Duration::MAX).unwrap(), 0);
        assert_eq!(store.sweep(days(u64::from(u32::MAX))).unwrap(), 0);
        assert_eq!(store.statistics().unwrap().total, 1);
    }

    #[test]
    fn test_statistics() {
        let (store, clock) = store_with_clock();
        let (a, _) = add(&store, "old");
        clock.advance(chrono::Duration::days(2));
        add(&store, "new one");
        add(&store, "new two");
        store.toggle_favorite(a.id).unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.favorite_count, 1);
        assert_eq!(stats.today_count, 2);
        assert_eq!(stats.storage_bytes, 0);
    }

    #[test]
    fn test_metadata_round_trips() {
        let store = store();
        let mut metadata = EntryMetadata::new();
        metadata.insert("source".to_string(), serde_json::json!("clipboard_monitor"));
        metadata.insert("lines".to_string(), serde_json::json!(3));

        let (entry, _) = store.upsert("fn main() {}", "code", metadata.clone()).unwrap();
        let loaded = store.get(entry.id).unwrap().unwrap();
        assert_eq!(loaded.metadata, metadata);
        assert_eq!(loaded.content_type, "code");
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let store = store();
        let (a, _) = add(&store, "one");
        add(&store, "two");

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.list(10, 0).unwrap().is_empty());

        let (b, is_new) = add(&store, "one");
        assert!(is_new);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("history.redb");

        let id = {
            let store = HistoryStore::open(&path).unwrap();
            let (entry, _) = add(&store, "survives restart");
            store.toggle_favorite(entry.id).unwrap();
            entry.id
        };

        let store = HistoryStore::open(&path).unwrap();
        let entry = store.get(id).unwrap().unwrap();
        assert_eq!(entry.content, "survives restart");
        assert!(entry.is_favorite);
        assert!(store.statistics().unwrap().storage_bytes > 0);
    }

    #[test]
    fn test_export_then_import() {
        let dir = TempDir::new().unwrap();
        let export_path = dir.path().join("export.json");

        let (source, clock) = store_with_clock();
        let (fav, _) = add(&source, "favorite snippet");
        source.toggle_favorite(fav.id).unwrap();
        clock.advance(chrono::Duration::seconds(1));
        add(&source, "plain snippet");

        assert_eq!(source.export(&export_path).unwrap(), 2);

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
        let records = raw.as_array().unwrap();
        assert_eq!(records.len(), 2);
        for field in ["id", "content", "content_type", "content_hash", "created_at", "last_seen_at", "size", "is_favorite", "metadata"] {
            assert!(records[0].get(field).is_some(), "missing field {}", field);
        }

        let target = store();
        add(&target, "plain snippet");
        let summary = target.import(&export_path).unwrap();
        assert_eq!(summary, ImportSummary { inserted: 1, touched: 1, skipped: 0 });

        let favorites: Vec<_> = target.list(10, 0).unwrap().into_iter().filter(|e| e.is_favorite).collect();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].content, "favorite snippet");
    }

    #[test]
    fn test_export_to_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = store();
        add(&store, "x");
        let err = store.export(&dir.path().join("missing").join("out.json")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_import_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not an array").unwrap();

        let err = store().import(&path).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(matches!(store().import(&dir.path().join("absent.json")), Err(AppError::Io(_))));
    }
}
