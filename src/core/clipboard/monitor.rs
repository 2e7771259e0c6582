use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::source::ClipboardSource;
use crate::shared::emit::{emit_event, SharedHandler};
use crate::shared::error::{AppError, AppResult};
use crate::shared::events::AppEvent;
use crate::shared::settings::MonitorSettings;
use crate::shared::types::ClipboardChange;

/// Consecutive failures before the backoff starts doubling
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Polling parameters
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub check_interval: Duration,
    /// Delay after a failed iteration
    pub error_backoff: Duration,
    /// Upper bound for the doubled backoff after repeated failures
    pub max_backoff: Duration,
    /// How long `stop` waits for the polling task to exit
    pub stop_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(500),
            error_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(3),
        }
    }
}

impl MonitorConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            check_interval: settings.interval(),
            ..Self::default()
        }
    }

    fn backoff_for(&self, consecutive_errors: u32) -> Duration {
        if consecutive_errors < MAX_CONSECUTIVE_ERRORS {
            return self.error_backoff;
        }
        // Exponential backoff up to max_backoff
        let exponent = (consecutive_errors - MAX_CONSECUTIVE_ERRORS).min(4);
        self.error_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

/// Decides whether the clipboard holds genuinely new text.
///
/// A counter bump alone is not a change: the text must also differ from the last
/// text that was emitted.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_counter: Option<u64>,
    last_emitted: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the current clipboard state without emitting it
    pub fn prime(&mut self, source: &dyn ClipboardSource) -> AppResult<()> {
        self.last_counter = Some(source.change_counter()?);
        self.last_emitted = source.read_text()?.filter(|text| !text.is_empty());
        Ok(())
    }

    /// One detection step. The counter is only recorded once the text read succeeds,
    /// so a failed read is retried on the next step.
    pub fn poll(&mut self, source: &dyn ClipboardSource) -> AppResult<Option<ClipboardChange>> {
        let counter = source.change_counter()?;
        if self.last_counter == Some(counter) {
            return Ok(None);
        }

        let text = source.read_text()?;
        self.last_counter = Some(counter);

        let Some(text) = text else {
            return Ok(None);
        };
        if text.is_empty() || self.last_emitted.as_deref() == Some(text.as_str()) {
            return Ok(None);
        }

        self.last_emitted = Some(text.clone());
        Ok(Some(ClipboardChange::new_text(text)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

struct RunningTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    /// Set once a stop timed out; the task lingers until its handler returns
    aborted: bool,
}

/// Clipboard monitor that polls a [`ClipboardSource`] on a background Tokio task.
///
/// The registered handler is called synchronously from the polling task with
/// `AppEvent::ClipboardChanged`; a slow handler delays the next poll.
pub struct ClipboardMonitor {
    source: Arc<dyn ClipboardSource>,
    handler: SharedHandler,
    config: MonitorConfig,
    task: Mutex<Option<RunningTask>>,
}

impl ClipboardMonitor {
    pub fn new(source: Arc<dyn ClipboardSource>, handler: SharedHandler, config: MonitorConfig) -> Self {
        Self {
            source,
            handler,
            config,
            task: Mutex::new(None),
        }
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<RunningTask>> {
        match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Monitor mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    /// Spawn the polling task on the current Tokio runtime.
    /// Calling it while already running does nothing.
    ///
    /// Fails with `AppError::System` while a task aborted by a timed-out `stop` is
    /// still inside its handler.
    pub fn start(&self) -> AppResult<()> {
        let mut task = self.lock_task();

        if let Some(running) = task.as_ref() {
            if !running.handle.is_finished() {
                if running.aborted {
                    return Err(AppError::System(
                        "Previous clipboard polling task is still shutting down".to_string(),
                    ));
                }
                tracing::info!("Clipboard monitor already running");
                return Ok(());
            }
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::System(format!("Clipboard monitor needs a Tokio runtime: {}", e)))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = runtime.spawn(poll_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.handler),
            self.config.clone(),
            stop_rx,
        ));

        *task = Some(RunningTask {
            stop_tx,
            handle,
            aborted: false,
        });
        Ok(())
    }

    /// Signal the polling task and wait (bounded by `stop_timeout`) for it to exit.
    ///
    /// A task that fails to exit in time is aborted and reported as `AppError::System`.
    /// Abort only lands at the task's next await, so a handler blocked in store I/O
    /// keeps running; until it returns the monitor reports `Running` and `start` is
    /// refused. On a `current_thread` runtime a blocking handler also holds off the
    /// timeout itself.
    pub async fn stop(&self) -> AppResult<()> {
        let running = self.lock_task().take();
        let Some(mut running) = running else {
            tracing::info!("Clipboard monitor not running");
            return Ok(());
        };

        // The receiver is gone if the task already exited; that is fine
        let _ = running.stop_tx.send(true);

        match tokio::time::timeout(self.config.stop_timeout, &mut running.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_cancelled() && running.aborted => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Clipboard polling task failed");
                Err(AppError::System(format!("Clipboard polling task failed: {}", e)))
            }
            Err(_) => {
                running.handle.abort();
                running.aborted = true;
                tracing::error!(timeout = ?self.config.stop_timeout, "Clipboard polling task did not stop in time");

                let mut task = self.lock_task();
                if task.is_none() {
                    *task = Some(running);
                }
                Err(AppError::System(format!(
                    "Clipboard polling task did not stop within {:?}",
                    self.config.stop_timeout
                )))
            }
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.lock_task().as_ref() {
            Some(running) if !running.handle.is_finished() => MonitorState::Running,
            _ => MonitorState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        if let Some(running) = self.lock_task().take() {
            let _ = running.stop_tx.send(true);
        }
    }
}

async fn poll_loop(
    source: Arc<dyn ClipboardSource>,
    handler: SharedHandler,
    config: MonitorConfig,
    mut stop_rx: watch::Receiver<bool>,
) {
    tracing::info!(interval = ?config.check_interval, "Clipboard monitor started");

    let mut detector = ChangeDetector::new();
    if let Err(e) = detector.prime(source.as_ref()) {
        tracing::warn!(error = %e, "Failed to read initial clipboard state");
    }

    let mut consecutive_errors = 0u32;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let delay = match detector.poll(source.as_ref()) {
            Ok(change) => {
                consecutive_errors = 0;
                if let Some(change) = change {
                    tracing::debug!(size = change.size, "Detected clipboard change");
                    emit_event(handler.as_ref(), AppEvent::ClipboardChanged(change));
                }
                config.check_interval
            }
            Err(e) => {
                consecutive_errors += 1;

                // Only log errors occasionally to avoid spam
                if consecutive_errors == 1 || consecutive_errors % 10 == 0 {
                    tracing::warn!(error = %e, consecutive_errors, "Failed to read clipboard");
                }
                if consecutive_errors == MAX_CONSECUTIVE_ERRORS {
                    tracing::warn!("Too many consecutive clipboard errors, reducing polling frequency");
                }
                config.backoff_for(consecutive_errors)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Clipboard monitor stopped");
}
