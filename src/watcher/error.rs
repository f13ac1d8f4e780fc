//! Error types for the directory watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from starting or running the watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch root does not exist: {path}")]
    RootMissing { path: PathBuf },

    #[error("Watch root is not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Initial scan aborted: {reason}")]
    ScanFailed { reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
