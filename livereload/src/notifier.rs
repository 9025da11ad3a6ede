//! Restart notification, gated on readiness.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::readiness::ReadinessProbe;
use crate::server::LiveReloadServer;

/// Notifies live reload subscribers after each successful restart.
///
/// With a readiness probe configured, notification waits until the new
/// process answers 200; a probe failure (including shutdown mid-poll) is
/// logged and suppresses that one notification only.
#[derive(Debug, Clone)]
pub struct RestartNotifier {
    server: LiveReloadServer,
    probe: Option<ReadinessProbe>,
}

impl RestartNotifier {
    /// Create a notifier for `server`, optionally gated on `probe`.
    pub fn new(server: LiveReloadServer, probe: Option<ReadinessProbe>) -> Self {
        Self { server, probe }
    }

    /// Called once per successful restart.
    pub async fn notify(&self, cancel: &CancellationToken) {
        if let Some(probe) = &self.probe {
            if let Err(err) = probe.wait(cancel).await {
                warn!("readiness check failed: {err}");
                return;
            }
        }

        let subscribers = self.server.publish_restart();
        debug!(subscribers, "notified restart");
    }
}
