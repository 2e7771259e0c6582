//! Clipboard history feature
//!
//! Owns the policy between the monitor and the store: filtered content never reaches
//! `upsert`, stored changes are announced to subscribers, and history entries can be
//! restored to the clipboard.

use std::time::Duration;
use serde_json::json;

use crate::core::clipboard::{ClipboardSource, FilterVerdict, HistoryStore, PolicyFilter};
use crate::shared::emit::{emit_event, EventHandler, SharedHandler};
use crate::shared::error::AppResult;
use crate::shared::events::AppEvent;
use crate::shared::types::{ClipboardChange, EntryMetadata, HistoryEntry};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Metadata `source` value for entries recorded from the monitor
pub const MONITOR_SOURCE: &str = "clipboard_monitor";

/// What happened to one observed change
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Stored { entry: HistoryEntry, is_new: bool },
    Dropped(FilterVerdict),
    Blank,
}

/// Monitor handler that filters clipboard changes and records them in the store
pub struct ClipboardRecorder {
    store: HistoryStore,
    policy: PolicyFilter,
    subscriber: SharedHandler,
}

impl ClipboardRecorder {
    pub fn new(store: HistoryStore, policy: PolicyFilter, subscriber: SharedHandler) -> Self {
        Self {
            store,
            policy,
            subscriber,
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Apply the policy and upsert accepted content.
    ///
    /// Store failures are announced as `OperationFailed` and returned; the caller
    /// decides whether to retry.
    pub fn record(&self, change: &ClipboardChange) -> AppResult<RecordOutcome> {
        if change.content.trim().is_empty() {
            return Ok(RecordOutcome::Blank);
        }

        let verdict = self.policy.evaluate(&change.content);
        if !verdict.is_accepted() {
            tracing::info!(?verdict, size = change.size, "Clipboard content filtered");
            return Ok(RecordOutcome::Dropped(verdict));
        }

        let mut metadata = EntryMetadata::new();
        metadata.insert("source".to_string(), json!(MONITOR_SOURCE));
        metadata.insert("timestamp".to_string(), json!(change.observed_at.to_rfc3339()));

        match self.store.upsert(&change.content, &change.content_type, metadata) {
            Ok((entry, is_new)) => {
                tracing::info!(id = entry.id, is_new, size = entry.size, "Clipboard entry saved");
                emit_event(
                    self.subscriber.as_ref(),
                    AppEvent::HistoryUpdated { entry: entry.clone(), is_new },
                );
                Ok(RecordOutcome::Stored { entry, is_new })
            }
            Err(e) => {
                emit_event(
                    self.subscriber.as_ref(),
                    AppEvent::OperationFailed {
                        operation: "save clipboard entry".to_string(),
                        error: e.clone(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Put a history entry back on the clipboard. Returns false when the id is unknown.
    ///
    /// The monitor then observes the write and the entry is touched like any other copy.
    pub fn restore(&self, id: u64, clipboard: &dyn ClipboardSource) -> AppResult<bool> {
        let Some(entry) = self.store.get(id)? else {
            return Ok(false);
        };

        clipboard.write_text(&entry.content)?;
        tracing::info!(id, "Restored history entry to clipboard");
        Ok(true)
    }

    /// Sweep entries older than `days`; 0 disables retention
    pub fn apply_retention(&self, days: u32) -> AppResult<usize> {
        if days == 0 {
            return Ok(0);
        }
        self.store.sweep(Duration::from_secs(u64::from(days) * SECONDS_PER_DAY))
    }
}

impl EventHandler for ClipboardRecorder {
    fn handle(&self, event: &AppEvent) {
        if let AppEvent::ClipboardChanged(change) = event {
            if let Err(e) = self.record(change) {
                tracing::error!(error = %e, "Failed to record clipboard change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::MemoryClipboard;
    use crate::shared::emit::NoopHandler;
    use crate::shared::settings::SecuritySettings;
    use std::sync::{Arc, Mutex};

    fn policy(patterns: &[&str], max: usize) -> PolicyFilter {
        PolicyFilter::from_settings(&SecuritySettings {
            max_content_length: max,
            filter_passwords: true,
            exclude_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
    }

    fn recorder(patterns: &[&str]) -> ClipboardRecorder {
        ClipboardRecorder::new(HistoryStore::in_memory().unwrap(), policy(patterns, 1000), Arc::new(NoopHandler))
    }

    fn change(text: &str) -> ClipboardChange {
        ClipboardChange::new_text(text.to_string())
    }

    #[test]
    fn test_filtered_content_never_reaches_store() {
        let recorder = recorder(&["secret"]);

        let outcome = recorder.record(&change("my secret key")).unwrap();
        assert_eq!(outcome, RecordOutcome::Dropped(FilterVerdict::Excluded));
        assert_eq!(recorder.store().statistics().unwrap().total, 0);
    }

    #[test]
    fn test_too_long_and_blank_dropped() {
        let recorder = ClipboardRecorder::new(
            HistoryStore::in_memory().unwrap(),
            policy(&[], 5),
            Arc::new(NoopHandler),
        );

        assert_eq!(
            recorder.record(&change("way too long")).unwrap(),
            RecordOutcome::Dropped(FilterVerdict::TooLong)
        );
        assert_eq!(recorder.record(&change("   ")).unwrap(), RecordOutcome::Blank);
        assert_eq!(recorder.store().statistics().unwrap().total, 0);
    }

    #[test]
    fn test_record_stores_provenance() {
        let recorder = recorder(&["secret"]);
        let observed = change("hello");

        let RecordOutcome::Stored { entry, is_new } = recorder.record(&observed).unwrap() else {
            panic!("expected stored outcome");
        };
        assert!(is_new);
        assert_eq!(entry.metadata["source"], json!("clipboard_monitor"));
        assert_eq!(entry.metadata["timestamp"], json!(observed.observed_at.to_rfc3339()));
    }

    #[test]
    fn test_subscriber_notified() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscriber: SharedHandler = Arc::new(move |event: &AppEvent| {
            if let AppEvent::HistoryUpdated { is_new, .. } = event {
                sink.lock().unwrap().push(*is_new);
            }
        });
        let recorder = ClipboardRecorder::new(HistoryStore::in_memory().unwrap(), policy(&[], 1000), subscriber);

        recorder.handle(&AppEvent::ClipboardChanged(change("copy me")));
        recorder.handle(&AppEvent::ClipboardChanged(change("copy me")));
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_restore_writes_clipboard() {
        let recorder = recorder(&[]);
        let clipboard = MemoryClipboard::new();
        let RecordOutcome::Stored { entry, .. } = recorder.record(&change("bring me back")).unwrap() else {
            panic!("expected stored outcome");
        };

        assert!(recorder.restore(entry.id, &clipboard).unwrap());
        assert_eq!(clipboard.read_text().unwrap().as_deref(), Some("bring me back"));
        assert!(!recorder.restore(entry.id + 100, &clipboard).unwrap());
    }

    #[test]
    fn test_retention_accepts_any_day_count() {
        let recorder = recorder(&[]);
        recorder.record(&change("kept")).unwrap();

        for days in [100_000_000, u32::MAX] {
            assert_eq!(recorder.apply_retention(days).unwrap(), 0);
        }
        assert_eq!(recorder.store().statistics().unwrap().total, 1);
    }

    #[test]
    fn test_retention_disabled_at_zero() {
        let recorder = recorder(&[]);
        recorder.record(&change("kept")).unwrap();
        assert_eq!(recorder.apply_retention(0).unwrap(), 0);
        assert_eq!(recorder.apply_retention(30).unwrap(), 0);
        assert_eq!(recorder.store().statistics().unwrap().total, 1);
    }
}
