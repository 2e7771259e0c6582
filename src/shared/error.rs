use thiserror::Error;
use serde::Serialize;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Rejected before touching the store (blank content, malformed import). Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backing store failure (I/O, corruption, transaction). Callers may retry.
    #[error("Storage Error: {0}")]
    Storage(String),

    /// Export/import/settings file failure, carrying the underlying cause.
    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Clipboard Error: {0}")]
    Clipboard(String),

    #[error("System Error: {0}")]
    System(String),

    #[error("Config Error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether the caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

// Implement conversion from standard errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON error: {}", err))
    }
}

// redb reports a distinct error type per operation; all of them are storage failures.
impl From<redb::Error> for AppError {
    fn from(err: redb::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<redb::DatabaseError> for AppError {
    fn from(err: redb::DatabaseError) -> Self {
        AppError::Storage(format!("Failed to open database: {}", err))
    }
}

impl From<redb::TransactionError> for AppError {
    fn from(err: redb::TransactionError) -> Self {
        AppError::Storage(format!("Failed to begin transaction: {}", err))
    }
}

impl From<redb::TableError> for AppError {
    fn from(err: redb::TableError) -> Self {
        AppError::Storage(format!("Failed to open table: {}", err))
    }
}

impl From<redb::StorageError> for AppError {
    fn from(err: redb::StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<redb::CommitError> for AppError {
    fn from(err: redb::CommitError) -> Self {
        AppError::Storage(format!("Failed to commit: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
