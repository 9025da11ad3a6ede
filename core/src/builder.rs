//! Build execution and failure classification.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::stdio::spawn_stderr_tee;
use refresh_watcher::WatchEvent;

/// Stderr text marking a build failure no amount of waiting for further file
/// events can fix. Best-effort heuristic: `go build` offers no structured
/// error channel.
const NO_BUILDABLE_SOURCES: &str = "no buildable Go source files";

/// Result of one build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The build succeeded; the output binary is in place.
    Success {
        /// Pid of the finished build process, for observability.
        pid: Option<u32>,

        /// Wall-clock build time.
        duration: Duration,
    },

    /// The build failed but a later source change may fix it.
    Recoverable { message: String },

    /// There is nothing buildable; the whole loop should shut down.
    Fatal { message: String },
}

/// Seam between the scheduler and the concrete build command.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Run one build for the change described by `event`.
    async fn build(&self, event: &WatchEvent) -> BuildOutcome;
}

/// Runs `go build` against the configured target.
pub struct GoBuilder {
    config: Arc<Config>,
    cancel: CancellationToken,
    program: String,
}

impl GoBuilder {
    pub fn new(config: Arc<Config>, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            program: "go".to_string(),
        }
    }

    /// Substitute the build executable, for tests.
    #[cfg(test)]
    fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["build".into(), "-v".into()];
        args.extend(self.config.build_flags.iter().map(OsString::from));
        args.push("-o".into());
        args.push(self.config.full_build_path().into());
        if !self.config.build_target_path.is_empty() {
            args.push(self.config.build_target_path.clone().into());
        }
        args
    }
}

#[async_trait]
impl BuildRunner for GoBuilder {
    async fn build(&self, event: &WatchEvent) -> BuildOutcome {
        info!(path = %event.path.display(), event = %event.kind, "building");
        let started = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(self.args());
        cmd.kill_on_drop(true);
        cmd.stderr(Stdio::piped());
        match (self.config.stdio.stdin.reader(), self.config.stdio.stdout.writer()) {
            (Ok(stdin), Ok(stdout)) => {
                cmd.stdin(stdin);
                cmd.stdout(stdout);
            }
            (Err(err), _) | (_, Err(err)) => {
                return BuildOutcome::Recoverable {
                    message: format!("binding build streams: {err}"),
                };
            }
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return BuildOutcome::Recoverable {
                    message: format!("starting build command: {err}"),
                };
            }
        };
        let pid = child.id();
        let tee = child
            .stderr
            .take()
            .map(|stderr| spawn_stderr_tee(stderr, self.config.stdio.stderr.clone()));

        let status = tokio::select! {
            status = child.wait() => status,
            _ = self.cancel.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return BuildOutcome::Recoverable {
                    message: "build aborted by shutdown".to_string(),
                };
            }
        };

        let captured = match tee {
            Some(tee) => tee.await.unwrap_or_default(),
            None => Vec::new(),
        };

        match status {
            Ok(status) if status.success() => {
                debug!(pid = ?pid, duration = ?started.elapsed(), "build complete");
                BuildOutcome::Success {
                    pid,
                    duration: started.elapsed(),
                }
            }
            Ok(status) => {
                let stderr = String::from_utf8_lossy(&captured);
                let message = format!("build command exited with {status}: {}", stderr.trim());
                if stderr.contains(NO_BUILDABLE_SOURCES) {
                    BuildOutcome::Fatal { message }
                } else {
                    BuildOutcome::Recoverable { message }
                }
            }
            Err(err) => BuildOutcome::Recoverable {
                message: format!("waiting for build command: {err}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::stdio::{StdioBinding, StdioConfig};

    fn quiet_config() -> Config {
        Config {
            stdio: StdioConfig {
                stdin: StdioBinding::Null,
                stdout: StdioBinding::Null,
                stderr: StdioBinding::Null,
            },
            ..Config::default()
        }
    }

    #[test]
    fn args_include_output_path_and_target() {
        let config = Config {
            build_flags: vec!["-race".to_string()],
            build_path: "/tmp/builds".into(),
            binary_name: "app".to_string(),
            build_target_path: "./cmd/server".to_string(),
            ..Config::default()
        };
        let builder = GoBuilder::new(Arc::new(config), CancellationToken::new());

        assert_eq!(
            builder.args(),
            vec![
                OsString::from("build"),
                OsString::from("-v"),
                OsString::from("-race"),
                OsString::from("-o"),
                OsString::from("/tmp/builds/app"),
                OsString::from("./cmd/server"),
            ]
        );
    }

    #[test]
    fn args_omit_empty_target() {
        let builder = GoBuilder::new(Arc::new(Config::default()), CancellationToken::new());
        let args = builder.args();
        assert_ne!(args.last(), Some(&OsString::from("")));
    }

    #[cfg(unix)]
    mod scripted {
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        use super::*;

        fn fake_build_command(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-go");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn builder_with(dir: &Path, body: &str) -> GoBuilder {
            let program = fake_build_command(dir, body);
            GoBuilder::new(Arc::new(quiet_config()), CancellationToken::new())
                .with_program(program.to_string_lossy().into_owned())
        }

        fn change() -> WatchEvent {
            WatchEvent {
                path: "/app/main.go".into(),
                kind: "write".to_string(),
            }
        }

        #[tokio::test]
        async fn zero_exit_is_success() {
            let dir = tempfile::tempdir().unwrap();
            let builder = builder_with(dir.path(), "exit 0");

            let outcome = builder.build(&change()).await;
            assert!(matches!(outcome, BuildOutcome::Success { pid: Some(_), .. }));
        }

        #[tokio::test]
        async fn missing_sources_are_fatal() {
            let dir = tempfile::tempdir().unwrap();
            let builder = builder_with(
                dir.path(),
                "echo 'main.go: no buildable Go source files in /app' >&2\nexit 1",
            );

            let outcome = builder.build(&change()).await;
            match outcome {
                BuildOutcome::Fatal { message } => {
                    assert!(message.contains("no buildable Go source files"));
                }
                other => panic!("expected fatal outcome, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn compile_errors_are_recoverable() {
            let dir = tempfile::tempdir().unwrap();
            let builder = builder_with(dir.path(), "echo 'syntax error' >&2\nexit 2");

            let outcome = builder.build(&change()).await;
            match outcome {
                BuildOutcome::Recoverable { message } => {
                    assert!(message.contains("syntax error"));
                }
                other => panic!("expected recoverable outcome, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn missing_build_command_is_recoverable() {
            let builder = GoBuilder::new(Arc::new(quiet_config()), CancellationToken::new())
                .with_program("/nonexistent/refresh-go");

            let outcome = builder.build(&change()).await;
            assert!(matches!(outcome, BuildOutcome::Recoverable { .. }));
        }

        #[tokio::test]
        async fn cancellation_kills_an_inflight_build() {
            let dir = tempfile::tempdir().unwrap();
            let cancel = CancellationToken::new();
            let program = fake_build_command(dir.path(), "sleep 30");
            let builder = GoBuilder::new(Arc::new(quiet_config()), cancel.clone())
                .with_program(program.to_string_lossy().into_owned());

            let canceller = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                canceller.cancel();
            });

            let started = Instant::now();
            let outcome = builder.build(&change()).await;
            assert!(matches!(outcome, BuildOutcome::Recoverable { .. }));
            assert!(started.elapsed() < Duration::from_secs(10));
        }
    }
}
