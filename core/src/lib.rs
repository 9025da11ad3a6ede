//! # Refresh Core
//!
//! The rebuild-and-restart loop behind the `refresh` tool.
//!
//! ## Architecture
//!
//! ```text
//! FileWatcher ──► BuildScheduler ──► GoBuilder ──► Runner ──► RestartNotifier
//!     │          (coalesce bursts,  (go build,    (stop old,  (readiness poll,
//!     │           serialize builds)  classify)     start new)  SSE publish)
//!     └───────────────── one shared CancellationToken ─────────────────┘
//! ```
//!
//! The [`Manager`] wires these together under one cancellable lifecycle: the
//! watcher produces filtered change events, the scheduler coalesces them and
//! runs at most one build at a time, a successful build makes the runner
//! replace the supervised process, and the optional live reload notifier
//! tells connected clients once the new process is ready. Cancelling the
//! shared token unwinds every component.

pub mod builder;
pub mod config;
pub mod error;
pub mod manager;
pub mod runner;
pub mod scheduler;
pub mod stdio;

pub use builder::{BuildOutcome, BuildRunner, GoBuilder};
pub use config::Config;
pub use error::{CoreError, Result};
pub use manager::Manager;
pub use runner::Runner;
pub use scheduler::{BuildRequests, BuildScheduler};
pub use stdio::{StdioBinding, StdioConfig};

// Re-export from dependencies for convenience
pub use refresh_watcher::WatchEvent;
