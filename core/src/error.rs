//! Error types for the rebuild loop.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that abort startup or a process start.
///
/// Build failures are not errors in this sense; they are classified
/// [`BuildOutcome`](crate::BuildOutcome) values handled inside the loop.
#[derive(Error, Debug)]
pub enum CoreError {
    /// File watcher setup failed.
    #[error("watcher error: {0}")]
    Watcher(#[from] refresh_watcher::WatcherError),

    /// Live reload server setup failed.
    #[error("live reload error: {0}")]
    LiveReload(#[from] refresh_livereload::LiveReloadError),

    /// A configured stdio binding could not be opened.
    #[error("binding process streams: {0}")]
    Stdio(#[source] std::io::Error),

    /// The supervised process could not be spawned.
    #[error("spawning {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
