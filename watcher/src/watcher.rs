//! Recursive file watcher implementation.

use std::path::PathBuf;

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, WatcherError};
use crate::event::{WatchEvent, kind_label};
use crate::filter::WatchFilter;

/// Watches an application root recursively and emits filtered change events.
///
/// Events are delivered on a capacity-1 channel and the producing side blocks
/// until the consumer takes each one; nothing is dropped here. Burst
/// coalescing is the scheduler's responsibility.
pub struct FileWatcher {
    root: PathBuf,
    included_extensions: Vec<String>,
    ignored_folders: Vec<String>,
}

impl FileWatcher {
    /// Create a watcher for `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        included_extensions: Vec<String>,
        ignored_folders: Vec<String>,
    ) -> Self {
        Self {
            root: root.into(),
            included_extensions,
            ignored_folders,
        }
    }

    /// Start watching.
    ///
    /// Consumes the watcher: a stopped watcher is not restartable. The
    /// returned channel yields events until `cancel` fires, after which the
    /// OS subscription is dropped and the channel closes.
    pub fn start(self, cancel: CancellationToken) -> Result<mpsc::Receiver<WatchEvent>> {
        let root = std::fs::canonicalize(&self.root).map_err(|source| WatcherError::Root {
            path: self.root.clone(),
            source,
        })?;
        let filter = WatchFilter::new(
            root.clone(),
            self.included_extensions,
            self.ignored_folders,
        );

        let (tx, rx) = mpsc::channel::<WatchEvent>(1);

        // The callback runs on the notify backend's own thread, so a
        // blocking send into the tokio channel is safe there.
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let Some(kind) = kind_label(event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if !filter.accepts(&path) {
                            continue;
                        }
                        let event = WatchEvent {
                            path,
                            kind: kind.to_string(),
                        };
                        if tx.blocking_send(event).is_err() {
                            // Receiver dropped, the loop is shutting down.
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!("watch error: {err}");
                }
            },
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!(root = %root.display(), "watching for changes");

        // Keep the OS subscription alive until cancellation, then drop it so
        // no further events are produced.
        tokio::spawn(async move {
            cancel.cancelled().await;
            drop(watcher);
            debug!("file watcher stopped");
        });

        Ok(rx)
    }
}
