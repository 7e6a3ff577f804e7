//! Error types and Result aliases for filedex.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using filedex's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for filedex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Directory scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Folder monitoring error.
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record exceeds the limits of the packed header encoding.
    #[error("record for '{name}' exceeds encoding limits: {reason}")]
    RecordTooLarge { name: String, reason: &'static str },
}

/// Directory scan errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A directory entry could not be listed; its subtree is abandoned.
    #[error("failed to list '{path}': {reason}")]
    ListFailed { path: String, reason: String },
}

/// Folder monitor errors.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Failed to attach a watch to a directory.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// The OS change-notification facility could not be initialized.
    #[error("failed to create watcher: {0}")]
    Init(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = Error::from(MonitorError::WatchFailed {
            path: "/tmp/gone".to_string(),
            reason: "no such directory".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("/tmp/gone"));
        assert!(msg.contains("no such directory"));
    }

    #[test]
    fn store_error_converts() {
        let err: Error = StoreError::RecordTooLarge {
            name: "x".to_string(),
            reason: "path too long",
        }
        .into();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn config_helper() {
        let err = Error::config("empty path");
        assert!(err.to_string().contains("empty path"));
    }
}
