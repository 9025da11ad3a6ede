//! Scheduling properties: coalescing, serialization, failure handling.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use refresh_core::{BuildOutcome, BuildRunner, BuildScheduler, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Records build calls and replays queued outcomes (success by default).
struct FakeBuilder {
    calls: Mutex<Vec<WatchEvent>>,
    outcomes: Mutex<VecDeque<BuildOutcome>>,
    built_tx: mpsc::UnboundedSender<()>,
}

impl FakeBuilder {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (built_tx, built_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                outcomes: Mutex::new(VecDeque::new()),
                built_tx,
            }),
            built_rx,
        )
    }

    fn push_outcome(&self, outcome: BuildOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    fn calls(&self) -> Vec<WatchEvent> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildRunner for FakeBuilder {
    async fn build(&self, event: &WatchEvent) -> BuildOutcome {
        self.calls.lock().unwrap().push(event.clone());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BuildOutcome::Success {
                pid: Some(1),
                duration: Duration::ZERO,
            });
        let _ = self.built_tx.send(());
        outcome
    }
}

fn write_event(path: &str) -> WatchEvent {
    WatchEvent {
        path: path.into(),
        kind: "write".to_string(),
    }
}

const BUILD_DELAY: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn init_event_builds_without_debounce_delay() {
    let cancel = CancellationToken::new();
    let (fake, _built_rx) = FakeBuilder::new();
    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());
    tokio::spawn(scheduler.run());

    let started = tokio::time::Instant::now();
    requests.request(WatchEvent::init("/app"));
    restart_rx.recv().await.unwrap();

    // No debounce applied, regardless of the configured delay.
    assert_eq!(started.elapsed(), Duration::ZERO);
    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_init());
}

#[tokio::test(start_paused = true)]
async fn burst_within_window_triggers_exactly_one_build() {
    let cancel = CancellationToken::new();
    let (fake, _built_rx) = FakeBuilder::new();
    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());
    tokio::spawn(scheduler.run());

    let started = tokio::time::Instant::now();
    requests.request(write_event("/app/a.go"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    requests.request(write_event("/app/b.go"));

    restart_rx.recv().await.unwrap();
    // One build, after the fixed window from the first event.
    assert_eq!(started.elapsed(), BUILD_DELAY);

    // Quiescence: nothing further happens.
    tokio::time::sleep(BUILD_DELAY * 3).await;
    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, std::path::PathBuf::from("/app/a.go"));
}

#[tokio::test(start_paused = true)]
async fn earliest_pending_event_names_the_build() {
    let cancel = CancellationToken::new();
    let (fake, _built_rx) = FakeBuilder::new();
    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());

    // Fill the single-slot queue before the scheduler starts consuming: the
    // second request must be discarded, not replace the first.
    requests.request(write_event("/app/first.go"));
    requests.request(write_event("/app/second.go"));
    tokio::spawn(scheduler.run());

    restart_rx.recv().await.unwrap();
    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, std::path::PathBuf::from("/app/first.go"));
}

#[tokio::test(start_paused = true)]
async fn recoverable_failure_does_not_signal_restart() {
    let cancel = CancellationToken::new();
    let (fake, mut built_rx) = FakeBuilder::new();
    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());
    tokio::spawn(scheduler.run());

    fake.push_outcome(BuildOutcome::Recoverable {
        message: "syntax error".to_string(),
    });
    requests.request(write_event("/app/a.go"));
    built_rx.recv().await.unwrap();

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(restart_rx.try_recv().is_err());

    // The loop keeps going: the next successful build restarts again.
    requests.request(write_event("/app/a.go"));
    restart_rx.recv().await.unwrap();
    assert_eq!(fake.calls().len(), 2);
    assert!(!cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_shuts_the_loop_down() {
    let cancel = CancellationToken::new();
    let (fake, _built_rx) = FakeBuilder::new();
    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());
    tokio::spawn(scheduler.run());

    fake.push_outcome(BuildOutcome::Fatal {
        message: "no buildable Go source files".to_string(),
    });
    requests.request(WatchEvent::init("/app"));

    cancel.cancelled().await;
    assert!(restart_rx.try_recv().is_err());

    // Later events must not build or restart anything.
    requests.request(write_event("/app/a.go"));
    tokio::time::sleep(BUILD_DELAY * 5).await;
    assert_eq!(fake.calls().len(), 1);
    assert!(restart_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn consecutive_successes_restart_in_order() {
    let cancel = CancellationToken::new();
    let (fake, _built_rx) = FakeBuilder::new();
    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());
    tokio::spawn(scheduler.run());

    requests.request(write_event("/app/a.go"));
    restart_rx.recv().await.unwrap();
    requests.request(write_event("/app/b.go"));
    restart_rx.recv().await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].path, std::path::PathBuf::from("/app/a.go"));
    assert_eq!(calls[1].path, std::path::PathBuf::from("/app/b.go"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_scheduler() {
    let cancel = CancellationToken::new();
    let (fake, _built_rx) = FakeBuilder::new();
    let (restart_tx, _restart_rx) = mpsc::channel(1);
    let (requests, scheduler) =
        BuildScheduler::new(fake.clone(), restart_tx, BUILD_DELAY, cancel.clone());
    let handle = tokio::spawn(scheduler.run());

    cancel.cancel();
    handle.await.unwrap();

    requests.request(write_event("/app/a.go"));
    tokio::time::sleep(BUILD_DELAY * 2).await;
    assert_eq!(fake.calls().len(), 0);
}
