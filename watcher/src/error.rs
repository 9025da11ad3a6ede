//! Error types for the file watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur while setting up file watching.
///
/// All of these are setup errors: once the watcher is running it reports
/// per-event problems through logging and keeps going.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The application root could not be resolved.
    #[error("resolving app root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS notification subscription failed.
    #[error("watching app root recursively: {0}")]
    Notify(#[from] notify::Error),
}
