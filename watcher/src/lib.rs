//! # File Watcher
//!
//! Recursive file system watching for the refresh rebuild loop.
//!
//! A [`FileWatcher`] subscribes to OS-level change notifications under an
//! application root and forwards the changes that matter (paths outside the
//! configured ignored folders, with one of the configured file extensions)
//! as [`WatchEvent`]s on a single-slot channel. Coalescing of rapid bursts is
//! deliberately not done here; that is the build scheduler's job.

pub mod error;
pub mod event;
pub mod filter;
pub mod watcher;

pub use error::{Result, WatcherError};
pub use event::WatchEvent;
pub use filter::WatchFilter;
pub use watcher::FileWatcher;
