//! Clipboard module
//!
//! Provides clipboard history tracking and monitoring functionality.
//!
//! This module contains:
//! - `hasher`: Content digest used as the deduplication key
//! - `history`: Persistent history store with deduplication, search and retention
//! - `source`: Clipboard access trait and its system/in-memory implementations
//! - `monitor`: Background task that detects clipboard changes
//! - `filter`: Security policy applied before content is stored

pub mod filter;
pub mod hasher;
pub mod history;
pub mod monitor;
pub mod source;

pub use filter::{FilterVerdict, PolicyFilter};
pub use hasher::content_hash;
pub use history::{Clock, HistoryStore, ManualClock, SystemClock};
pub use monitor::{ChangeDetector, ClipboardMonitor, MonitorConfig, MonitorState};
pub use source::{ClipboardSource, MemoryClipboard, SystemClipboard};
