//! Application wiring: settings, store, recorder and monitor in one place.

use std::sync::Arc;

use crate::core::clipboard::{ClipboardMonitor, ClipboardSource, HistoryStore, MonitorConfig, PolicyFilter};
use crate::core::features::ClipboardRecorder;
use crate::shared::emit::SharedHandler;
use crate::shared::error::AppResult;
use crate::shared::settings::AppSettings;

/// A running clipboard history service
pub struct ClipboardApp {
    settings: AppSettings,
    source: Arc<dyn ClipboardSource>,
    recorder: Arc<ClipboardRecorder>,
    monitor: ClipboardMonitor,
}

impl ClipboardApp {
    /// Build the service. `subscriber` receives `HistoryUpdated` and `OperationFailed`.
    pub fn new(
        settings: AppSettings,
        store: HistoryStore,
        source: Arc<dyn ClipboardSource>,
        subscriber: SharedHandler,
    ) -> AppResult<Self> {
        settings.validate()?;

        let recorder = Arc::new(ClipboardRecorder::new(
            store,
            PolicyFilter::from_settings(&settings.security),
            subscriber,
        ));
        let handler: SharedHandler = recorder.clone();
        let monitor = ClipboardMonitor::new(
            Arc::clone(&source),
            handler,
            MonitorConfig::from_settings(&settings.monitor),
        );

        Ok(Self {
            settings,
            source,
            recorder,
            monitor,
        })
    }

    /// Open the configured database and build the service
    pub fn from_settings(
        settings: AppSettings,
        source: Arc<dyn ClipboardSource>,
        subscriber: SharedHandler,
    ) -> AppResult<Self> {
        let store = HistoryStore::open_with_fallback(&settings.database_path()?)?;
        Self::new(settings, store, source, subscriber)
    }

    /// Run the retention sweep, then start monitoring when `auto_start` is set
    pub fn startup(&self) -> AppResult<()> {
        // Retention failures do not prevent monitoring
        match self.recorder.apply_retention(self.settings.database.auto_cleanup_days) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Removed expired clipboard entries"),
            Err(e) => tracing::warn!(error = %e, "Retention sweep failed"),
        }

        if self.settings.monitor.auto_start {
            self.monitor.start()?;
            tracing::info!("Clipboard monitoring started");
        } else {
            tracing::info!("Clipboard monitoring auto start disabled");
        }
        Ok(())
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        self.monitor.stop().await
    }

    /// Put a history entry back on the clipboard
    pub fn restore(&self, id: u64) -> AppResult<bool> {
        self.recorder.restore(id, self.source.as_ref())
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn store(&self) -> &HistoryStore {
        self.recorder.store()
    }

    pub fn recorder(&self) -> &ClipboardRecorder {
        &self.recorder
    }

    pub fn monitor(&self) -> &ClipboardMonitor {
        &self.monitor
    }
}
