//! Clipboard history: a persistent, deduplicated store of copied text plus a
//! polling monitor that feeds it.
//!
//! [`ClipboardApp`] wires the pieces together; the individual parts are public for
//! embedding with a custom clipboard source or event subscriber.

pub mod app;
pub mod cli;
pub mod core;
pub mod shared;

pub use app::ClipboardApp;
pub use self::core::clipboard::{
    ClipboardMonitor, ClipboardSource, HistoryStore, MemoryClipboard, MonitorConfig, PolicyFilter,
    SystemClipboard,
};
pub use self::core::features::{ClipboardRecorder, RecordOutcome};
pub use shared::emit::{ChannelHandler, EventHandler, SharedHandler};
pub use shared::events::AppEvent;
pub use shared::settings::AppSettings;
pub use shared::types::{ClipboardChange, HistoryEntry, HistoryStats, ImportSummary};
pub use shared::{AppError, AppResult};
