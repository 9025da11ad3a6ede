//! Readiness probing for a freshly restarted process.

use refresh_utils_backoff::{retry, ExponentialBackoff, RetryError, RetryFailure};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{LiveReloadError, Result};

/// Polls a readiness URL until it answers 200.
///
/// Anything else (transport errors, other status codes) is transient and
/// retried with exponential backoff. Cancellation of the shared token is
/// permanent: once shutdown is requested no further probe is sent.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    url: String,
    backoff: ExponentialBackoff,
}

impl ReadinessProbe {
    /// Probe `url` with the default backoff schedule.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: ExponentialBackoff::default(),
        }
    }

    /// Override the backoff schedule.
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Block until the endpoint reports ready, the policy gives up, or
    /// shutdown is requested.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        debug!(url = %self.url, "waiting for readiness");

        let client = reqwest::Client::new();
        retry(self.backoff, cancel, || {
            let request = client.get(&self.url);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|err| RetryError::Transient(LiveReloadError::Probe(err)))?;
                if response.status() != StatusCode::OK {
                    return Err(RetryError::Transient(LiveReloadError::NotReady {
                        status: response.status().as_u16(),
                    }));
                }
                Ok(())
            }
        })
        .await
        .map_err(|failure| match failure {
            RetryFailure::Cancelled => LiveReloadError::Cancelled,
            RetryFailure::Permanent(err) | RetryFailure::Exhausted(err) => err,
        })?;

        debug!("readiness check successful");
        Ok(())
    }
}
