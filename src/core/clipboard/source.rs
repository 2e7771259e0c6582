//! Clipboard access seam.
//!
//! The monitor only depends on [`ClipboardSource`]; `SystemClipboard` is the OS-backed
//! implementation and `MemoryClipboard` an in-process one for embedding and tests.

use std::sync::Mutex;
use arboard::Clipboard;

use super::hasher::content_hash;
use crate::shared::error::{AppError, AppResult};

/// Read access to a clipboard plus a change counter
pub trait ClipboardSource: Send + Sync {
    /// Current text, `None` when the clipboard holds no text
    fn read_text(&self) -> AppResult<Option<String>>;

    /// A value that increases whenever the clipboard owner changes.
    /// Not necessarily by one, and not necessarily on every real change.
    fn change_counter(&self) -> AppResult<u64>;

    /// Put text on the clipboard (used to restore history entries)
    fn write_text(&self, _text: &str) -> AppResult<()> {
        Err(AppError::Clipboard("clipboard source is read-only".to_string()))
    }
}

#[derive(Default)]
struct CounterState {
    counter: u64,
    last_hash: Option<String>,
}

/// OS clipboard via arboard.
///
/// arboard exposes no change counter, so one is synthesized: it is bumped whenever
/// the digest of the observed text differs from the previous observation.
pub struct SystemClipboard {
    clipboard: Mutex<Option<Clipboard>>,
    state: Mutex<CounterState>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self {
            clipboard: Mutex::new(None),
            state: Mutex::new(CounterState::default()),
        }
    }

    fn with_clipboard<T, F>(&self, op: F) -> Result<T, arboard::Error>
    where
        F: FnOnce(&mut Clipboard) -> Result<T, arboard::Error>,
    {
        let mut guard = match self.clipboard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Clipboard mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        };

        if guard.is_none() {
            *guard = Some(Clipboard::new()?);
        }
        let result = match guard.as_mut() {
            Some(clipboard) => op(clipboard),
            None => Err(arboard::Error::ClipboardNotSupported),
        };
        if matches!(result, Err(arboard::Error::ClipboardOccupied) | Err(arboard::Error::Unknown { .. })) {
            // Reconnect on the next call
            *guard = None;
        }
        result
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&self) -> AppResult<Option<String>> {
        match self.with_clipboard(|clipboard| clipboard.get_text()) {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(AppError::Clipboard(format!("Failed to read clipboard: {}", e))),
        }
    }

    fn change_counter(&self) -> AppResult<u64> {
        let hash = self.read_text()?.as_deref().map(content_hash);

        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.last_hash != hash {
            state.counter += 1;
            state.last_hash = hash;
        }
        Ok(state.counter)
    }

    fn write_text(&self, text: &str) -> AppResult<()> {
        self.with_clipboard(|clipboard| clipboard.set_text(text))
            .map_err(|e| AppError::Clipboard(format!("Failed to set clipboard contents: {}", e)))
    }
}

#[derive(Default)]
struct MemoryState {
    text: Option<String>,
    counter: u64,
    failing_reads: usize,
}

/// In-process clipboard with an explicit counter
#[derive(Default)]
pub struct MemoryClipboard {
    state: Mutex<MemoryState>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the text and bump the counter, like a copy in another application
    pub fn copy(&self, text: &str) {
        let mut state = self.lock();
        state.text = Some(text.to_string());
        state.counter += 1;
    }

    /// Bump the counter without changing the text
    pub fn bump(&self) {
        self.lock().counter += 1;
    }

    /// Empty the clipboard and bump the counter
    pub fn clear(&self) {
        let mut state = self.lock();
        state.text = None;
        state.counter += 1;
    }

    /// Make the next `count` reads (counter or text) fail
    pub fn fail_next_reads(&self, count: usize) {
        self.lock().failing_reads = count;
    }

    fn take_failure(state: &mut MemoryState) -> AppResult<()> {
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(AppError::Clipboard("clipboard unavailable".to_string()));
        }
        Ok(())
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read_text(&self) -> AppResult<Option<String>> {
        let mut state = self.lock();
        Self::take_failure(&mut state)?;
        Ok(state.text.clone())
    }

    fn change_counter(&self) -> AppResult<u64> {
        let mut state = self.lock();
        Self::take_failure(&mut state)?;
        Ok(state.counter)
    }

    fn write_text(&self, text: &str) -> AppResult<()> {
        self.copy(text);
        Ok(())
    }
}
