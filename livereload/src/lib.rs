//! # Live Reload
//!
//! Server-sent-events plumbing that lets browser clients reload after the
//! supervised process restarts.
//!
//! The [`LiveReloadServer`] binds an ephemeral local HTTP listener serving
//! one named event stream. Its URL and the restart event name are handed to
//! the supervised process through environment variables so in-app client
//! code can subscribe. After each successful restart a [`RestartNotifier`]
//! optionally polls a readiness URL with exponential backoff and, once the
//! new process answers 200, publishes one `refresh-restart` event to every
//! subscriber.

pub mod error;
pub mod notifier;
pub mod readiness;
pub mod server;

pub use error::{LiveReloadError, Result};
pub use notifier::RestartNotifier;
pub use readiness::ReadinessProbe;
pub use server::{LiveReloadServer, RESTART_EVENT, SSE_EVENT_ENV, SSE_URL_ENV, STREAM_NAME};
