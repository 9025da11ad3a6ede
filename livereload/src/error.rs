//! Error types for live reload.

use thiserror::Error;

/// Result type alias for live reload operations.
pub type Result<T> = std::result::Result<T, LiveReloadError>;

/// Errors that can occur in the live reload server and readiness probe.
#[derive(Error, Debug)]
pub enum LiveReloadError {
    /// The ephemeral listener could not be bound.
    #[error("binding live reload listener: {0}")]
    Bind(#[source] std::io::Error),

    /// A readiness probe request failed at the transport level.
    #[error("readiness probe failed: {0}")]
    Probe(#[from] reqwest::Error),

    /// The readiness endpoint answered, but not with 200.
    #[error("unexpected status code: {status}")]
    NotReady { status: u16 },

    /// Shutdown was requested while waiting for readiness.
    #[error("shutdown requested during readiness check")]
    Cancelled,
}
