//! Build scheduling: burst coalescing and serialization.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::builder::{BuildOutcome, BuildRunner};
use refresh_watcher::WatchEvent;

/// Producer side of the build request queue.
///
/// The queue holds at most one pending event. Submitting while one is
/// pending discards the new event: the earliest event of a burst names the
/// build, later ones only confirm that one should happen.
#[derive(Clone)]
pub struct BuildRequests {
    tx: mpsc::Sender<WatchEvent>,
}

impl BuildRequests {
    /// Request a build for `event`. Never blocks.
    pub fn request(&self, event: WatchEvent) {
        debug!(path = %event.path.display(), event = %event.kind, "build requested");
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("build request ignored, another is pending");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("build request dropped, scheduler stopped");
            }
        }
    }
}

/// Consumes build requests one at a time: debounce, build, signal restart.
///
/// The scheduler is the only place builds are initiated, so builds are
/// serialized by construction.
pub struct BuildScheduler {
    requests_rx: mpsc::Receiver<WatchEvent>,
    builder: Arc<dyn BuildRunner>,
    restart_tx: mpsc::Sender<()>,
    build_delay: Duration,
    cancel: CancellationToken,
}

impl BuildScheduler {
    /// Create the scheduler and the request handle feeding it.
    pub fn new(
        builder: Arc<dyn BuildRunner>,
        restart_tx: mpsc::Sender<()>,
        build_delay: Duration,
        cancel: CancellationToken,
    ) -> (BuildRequests, Self) {
        let (tx, requests_rx) = mpsc::channel(1);
        (
            BuildRequests { tx },
            Self {
                requests_rx,
                builder,
                restart_tx,
                build_delay,
                cancel,
            },
        )
    }

    /// Process build requests until cancellation or a fatal build failure.
    pub async fn run(mut self) {
        loop {
            let event = tokio::select! {
                event = self.requests_rx.recv() => match event {
                    Some(event) => event,
                    None => return,
                },
                _ = self.cancel.cancelled() => return,
            };

            self.drain_requests(&event).await;
            if self.cancel.is_cancelled() {
                return;
            }

            match self.builder.build(&event).await {
                BuildOutcome::Success { .. } => {
                    let sent = tokio::select! {
                        sent = self.restart_tx.send(()) => sent.is_ok(),
                        _ = self.cancel.cancelled() => return,
                    };
                    if !sent {
                        return;
                    }
                }
                BuildOutcome::Recoverable { message } => {
                    error!("build error occurred: {message}");
                }
                BuildOutcome::Fatal { message } => {
                    error!("unable to build: {message}");
                    self.cancel.cancel();
                    return;
                }
            }
        }
    }

    /// Absorb further requests until the debounce window elapses.
    ///
    /// The window is fixed: events arriving inside it are discarded and do
    /// not extend it. The synthetic init event skips the window entirely.
    async fn drain_requests(&mut self, first: &WatchEvent) {
        if first.is_init() {
            return;
        }

        let window = tokio::time::sleep(self.build_delay);
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => return,
                skipped = self.requests_rx.recv() => match skipped {
                    Some(event) => {
                        debug!(
                            path = %event.path.display(),
                            event = %event.kind,
                            "skipping event until debounce window elapses"
                        );
                    }
                    None => return,
                },
                _ = self.cancel.cancelled() => return,
            }
        }
    }
}
