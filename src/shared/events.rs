use serde::Serialize;
use super::error::AppError;
use super::types::{ClipboardChange, HistoryEntry};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")] // Tagged enum so subscribers can dispatch on the name
pub enum AppEvent {
    /// Raised by the monitor when genuinely new clipboard text is observed
    #[serde(rename = "clipboard_changed")]
    ClipboardChanged(ClipboardChange),

    /// Raised by the recorder after a change was stored (inserted or touched)
    #[serde(rename = "history_updated")]
    HistoryUpdated { entry: HistoryEntry, is_new: bool },

    /// A store operation failed; `operation` names it for the user-facing notice
    #[serde(rename = "operation_failed")]
    OperationFailed { operation: String, error: AppError },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::ClipboardChanged(_) => "clipboard_changed",
            AppEvent::HistoryUpdated { .. } => "history_updated",
            AppEvent::OperationFailed { .. } => "operation_failed",
        }
    }
}
