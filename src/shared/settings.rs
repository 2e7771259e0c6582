use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use directories::ProjectDirs;
use super::error::{AppError, AppResult};

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "clipboard-keeper";
const APPLICATION: &str = "clipboard-keeper";
const SETTINGS_FILE: &str = "settings.json";
const DATABASE_FILE: &str = "history.redb";

/// Accepted range for `monitor.check_interval`, in seconds
pub const MIN_CHECK_INTERVAL_SECS: f64 = 0.01;
pub const MAX_CHECK_INTERVAL_SECS: f64 = 3600.0;

/// Application settings.
///
/// Every section and field carries a default, so a partial settings file overrides
/// only the fields it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub database: DatabaseSettings,
    pub monitor: MonitorSettings,
    pub security: SecuritySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; `None` resolves to the platform data directory
    pub path: Option<PathBuf>,
    /// Retention window for the startup sweep (0 disables it)
    pub auto_cleanup_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Poll interval in seconds, between 0.01 and 3600
    pub check_interval: f64,
    pub auto_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Maximum accepted content length in characters
    pub max_content_length: usize,
    pub filter_passwords: bool,
    pub exclude_patterns: Vec<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            auto_cleanup_days: 30,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval: 0.5,
            auto_start: true,
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_content_length: 1_000_000,
            filter_passwords: true,
            exclude_patterns: ["password", "passwd", "secret", "token"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl MonitorSettings {
    /// Poll interval as a `Duration`, clamped to the accepted range.
    /// A NaN interval falls back to the default.
    pub fn interval(&self) -> Duration {
        let secs = if self.check_interval.is_nan() {
            Self::default().check_interval
        } else {
            self.check_interval.clamp(MIN_CHECK_INTERVAL_SECS, MAX_CHECK_INTERVAL_SECS)
        };
        Duration::from_secs_f64(secs)
    }
}

impl AppSettings {
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or_else(|| AppError::Config("Failed to determine project directories".to_string()))
    }

    pub fn get_settings_path() -> AppResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join(SETTINGS_FILE))
    }

    /// Configured database path, or the platform data directory default
    pub fn database_path(&self) -> AppResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }

    /// Load from the default settings path
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::get_settings_path()?)
    }

    /// Load settings from `path`, writing defaults there when the file is missing.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path)?;
            tracing::info!(path = %path.display(), "Settings file missing, wrote defaults");
            return Ok(settings);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Io(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize settings: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| AppError::Io(format!("Failed to write settings file: {}", e)))
    }

    /// Check value ranges; reports every problem at once
    pub fn validate(&self) -> AppResult<()> {
        let mut problems = Vec::new();

        let interval = self.monitor.check_interval;
        let in_range = Duration::try_from_secs_f64(interval).is_ok()
            && (MIN_CHECK_INTERVAL_SECS..=MAX_CHECK_INTERVAL_SECS).contains(&interval);
        if !in_range {
            problems.push(format!(
                "monitor.check_interval must be between {} and {} seconds (got {})",
                MIN_CHECK_INTERVAL_SECS, MAX_CHECK_INTERVAL_SECS, interval
            ));
        }
        if self.security.max_content_length == 0 {
            problems.push("security.max_content_length must be greater than 0".to_string());
        }
        if self.security.exclude_patterns.iter().any(|p| p.trim().is_empty()) {
            problems.push("security.exclude_patterns must not contain blank patterns".to_string());
        }
        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                problems.push("database.path must not be empty".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(problems.join("; ")))
        }
    }
}
