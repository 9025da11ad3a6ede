//! Ephemeral SSE server publishing restart events.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::{debug, error};

use crate::error::{LiveReloadError, Result};

/// Name of the single event stream.
pub const STREAM_NAME: &str = "refresh";

/// Event type published after a successful restart.
pub const RESTART_EVENT: &str = "refresh-restart";

/// Environment variable carrying the subscription URL for the supervised
/// process.
pub const SSE_URL_ENV: &str = "REFRESH_LIVE_RELOAD_SSE_URL";

/// Environment variable carrying the restart event name.
pub const SSE_EVENT_ENV: &str = "REFRESH_LIVE_RELOAD_SSE_EVENT";

const RESTART_MESSAGE: &str = "The server has been restarted";

/// One published server-sent event.
#[derive(Debug, Clone)]
struct ReloadEvent {
    event: String,
    data: String,
}

#[derive(Clone)]
struct SseState {
    events: broadcast::Sender<ReloadEvent>,
    cancel: CancellationToken,
}

/// Live reload SSE server on an ephemeral local port.
///
/// Cheap to clone; all clones publish into the same subscriber set. The
/// listener shuts down when the cancellation token passed to [`start`]
/// fires.
///
/// [`start`]: LiveReloadServer::start
#[derive(Debug, Clone)]
pub struct LiveReloadServer {
    addr: SocketAddr,
    events: broadcast::Sender<ReloadEvent>,
}

impl LiveReloadServer {
    /// Bind `127.0.0.1:0` and start serving the event stream.
    pub async fn start(cancel: CancellationToken) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(LiveReloadError::Bind)?;
        let addr = listener.local_addr().map_err(LiveReloadError::Bind)?;

        let (events, _) = broadcast::channel(16);
        let state = SseState {
            events: events.clone(),
            cancel: cancel.clone(),
        };

        let router = Router::new()
            .route("/", get(subscribe))
            .layer(cors_layer())
            .with_state(state);

        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await;
            if let Err(err) = result {
                error!("live reload server failed: {err}");
            }
            debug!("live reload server stopped");
        });

        let server = Self { addr, events };
        debug!(url = %server.stream_url(), "live reload server started");
        Ok(server)
    }

    /// Local address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Subscription URL handed to the supervised process.
    pub fn stream_url(&self) -> String {
        format!("http://{}/?stream={STREAM_NAME}", self.addr)
    }

    /// The environment entries injected into the supervised process, in
    /// `KEY=value` form.
    pub fn command_env(&self) -> Vec<String> {
        vec![
            format!("{SSE_URL_ENV}={}", self.stream_url()),
            format!("{SSE_EVENT_ENV}={RESTART_EVENT}"),
        ]
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Publish one restart event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was delivered to.
    pub fn publish_restart(&self) -> usize {
        let event = ReloadEvent {
            event: RESTART_EVENT.to_string(),
            data: RESTART_MESSAGE.to_string(),
        };
        // Send fails only when there are no subscribers, which is fine.
        self.events.send(event).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    stream: Option<String>,
}

async fn subscribe(
    State(state): State<SseState>,
    Query(query): Query<StreamQuery>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, StatusCode>
{
    if query.stream.as_deref() != Some(STREAM_NAME) {
        return Err(StatusCode::NOT_FOUND);
    }

    let rx = state.events.subscribe();
    // End each subscriber stream on shutdown so graceful shutdown is not
    // held open by long-lived SSE connections.
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| async move {
            match result {
                Ok(event) => Some(Ok(Event::default().event(event.event).data(event.data))),
                // A lagged subscriber skips missed events and keeps going.
                Err(_) => None,
            }
        })
        .take_until(state.cancel.cancelled_owned());

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::HEAD,
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn stream_url_names_the_stream() {
        let cancel = CancellationToken::new();
        let server = LiveReloadServer::start(cancel.clone()).await.unwrap();

        let url = server.stream_url();
        assert!(url.starts_with("http://127.0.0.1:"));
        assert!(url.ends_with("/?stream=refresh"));

        cancel.cancel();
    }

    #[tokio::test]
    async fn command_env_carries_the_contract() {
        let cancel = CancellationToken::new();
        let server = LiveReloadServer::start(cancel.clone()).await.unwrap();

        let env = server.command_env();
        assert_eq!(env.len(), 2);
        assert!(env[0].starts_with("REFRESH_LIVE_RELOAD_SSE_URL=http://127.0.0.1:"));
        assert_eq!(
            env[1],
            "REFRESH_LIVE_RELOAD_SSE_EVENT=refresh-restart".to_string()
        );

        cancel.cancel();
    }

    #[tokio::test]
    async fn publishing_without_subscribers_reports_zero() {
        let cancel = CancellationToken::new();
        let server = LiveReloadServer::start(cancel.clone()).await.unwrap();

        assert_eq!(server.subscriber_count(), 0);
        assert_eq!(server.publish_restart(), 0);

        cancel.cancel();
    }
}
