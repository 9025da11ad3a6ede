//! Composition of the rebuild loop under one cancellable lifecycle.

use std::sync::Arc;

use refresh_livereload::{LiveReloadServer, ReadinessProbe, RestartNotifier};
use refresh_watcher::{FileWatcher, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::builder::GoBuilder;
use crate::config::Config;
use crate::error::Result;
use crate::runner::Runner;
use crate::scheduler::BuildScheduler;

/// Wires watcher, scheduler, builder, runner and live reload together.
///
/// Owns no loop logic of its own: it starts the pieces, injects the
/// synthetic init event for the unconditional first build, and then runs the
/// process supervisor on the calling task until the shared token is
/// cancelled.
pub struct Manager {
    config: Config,
    cancel: CancellationToken,
}

impl Manager {
    pub fn new(config: Config, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Run the loop. Returns once cancellation has unwound every component,
    /// or early with a setup error.
    pub async fn start(mut self) -> Result<()> {
        let watcher = FileWatcher::new(
            self.config.app_root.clone(),
            self.config.included_extensions.clone(),
            self.config.ignored_folders.clone(),
        );
        let mut events = watcher.start(self.cancel.clone())?;

        let notifier = if self.config.live_reload {
            let server = LiveReloadServer::start(self.cancel.clone()).await?;
            // Let the supervised process discover the stream.
            self.config.command_env.extend(server.command_env());
            let probe = self.config.readiness_url.clone().map(ReadinessProbe::new);
            Some(RestartNotifier::new(server, probe))
        } else {
            None
        };

        let config = Arc::new(self.config);
        let (restart_tx, restart_rx) = mpsc::channel(1);
        let builder = Arc::new(GoBuilder::new(config.clone(), self.cancel.clone()));
        let (requests, scheduler) = BuildScheduler::new(
            builder,
            restart_tx,
            config.build_delay,
            self.cancel.clone(),
        );
        tokio::spawn(scheduler.run());

        // The unconditional first build.
        requests.request(WatchEvent::init(config.app_root.clone()));

        if config.debug {
            debug!("debug mode, watch events will not trigger rebuilds");
        } else {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        event = events.recv() => match event {
                            Some(event) => requests.request(event),
                            None => return,
                        },
                        _ = cancel.cancelled() => return,
                    }
                }
            });
        }

        Runner::new(config, restart_rx, notifier, self.cancel)
            .run()
            .await;
        Ok(())
    }
}
