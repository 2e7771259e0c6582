//! Application-level features built on the clipboard core
//!
//! - `clipboard`: records monitor changes into the history store, restore and retention

pub mod clipboard;

pub use clipboard::{ClipboardRecorder, RecordOutcome};
