//! Supervision of the single running instance of the built binary.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;

use refresh_livereload::RestartNotifier;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::stdio::spawn_stderr_tee;

/// The one running instance of the supervised process.
struct RunningProcess {
    child: Child,
    pid: Option<u32>,
    started_at: Instant,
    stderr_task: Option<JoinHandle<Vec<u8>>>,
}

impl RunningProcess {
    /// Ask the process to terminate. The caller reaps it with `wait`.
    #[cfg(unix)]
    fn terminate(&mut self) {
        if let Some(pid) = self.child.id() {
            unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Owns the zero-or-one supervised child process.
///
/// One restart signal arrives per successful build. Each restart fully stops
/// the previous instance before the new one starts, so two instances never
/// run concurrently, even transiently. A crash of the running instance is
/// logged but only a new successful build starts another one.
pub struct Runner {
    config: Arc<Config>,
    restart_rx: mpsc::Receiver<()>,
    notifier: Option<RestartNotifier>,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        config: Arc<Config>,
        restart_rx: mpsc::Receiver<()>,
        notifier: Option<RestartNotifier>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            restart_rx,
            notifier,
            cancel,
        }
    }

    /// Supervise until cancellation. Always stops the child before
    /// returning.
    pub async fn run(mut self) {
        let mut current: Option<RunningProcess> = None;

        loop {
            tokio::select! {
                signal = self.restart_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    self.stop(&mut current).await;
                    match self.spawn_process() {
                        Ok(process) => {
                            info!(pid = ?process.pid, "starting process");
                            current = Some(process);
                            self.spawn_restart_notification();
                        }
                        Err(err) => error!("starting process: {err}"),
                    }
                }
                status = wait_running(&mut current) => {
                    if let Some(process) = current.take() {
                        report_exit(process, status).await;
                    }
                }
                _ = self.cancel.cancelled() => break,
            }
        }

        self.stop(&mut current).await;
    }

    /// Stop the current instance, if any, and wait for it to exit.
    async fn stop(&self, current: &mut Option<RunningProcess>) {
        let Some(mut process) = current.take() else {
            return;
        };

        info!(pid = ?process.pid, "stopping process");
        process.terminate();
        match process.child.wait().await {
            Ok(status) => debug!(pid = ?process.pid, status = %status, "process stopped"),
            Err(err) => warn!("waiting for process to stop: {err}"),
        }
    }

    fn spawn_process(&self) -> Result<RunningProcess> {
        let binary = self.config.full_build_path();

        let mut cmd = if self.config.debug {
            let mut cmd = Command::new("dlv");
            cmd.arg("exec").arg(&binary);
            cmd
        } else {
            Command::new(&binary)
        };
        cmd.args(&self.config.command_flags);

        // Registered entries take precedence over the inherited environment.
        for entry in &self.config.command_env {
            if let Some((key, value)) = entry.split_once('=') {
                cmd.env(key, value);
            }
        }

        cmd.stdin(self.config.stdio.stdin.reader().map_err(CoreError::Stdio)?);
        cmd.stdout(self.config.stdio.stdout.writer().map_err(CoreError::Stdio)?);
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| CoreError::Spawn {
            program: binary.display().to_string(),
            source,
        })?;
        let pid = child.id();
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| spawn_stderr_tee(stderr, self.config.stdio.stderr.clone()));

        debug!(pid = ?pid, program = %binary.display(), "running");
        Ok(RunningProcess {
            child,
            pid,
            started_at: Instant::now(),
            stderr_task,
        })
    }

    /// Kick off the live reload notification for a fresh start. Runs
    /// detached so readiness polling never blocks supervision.
    fn spawn_restart_notification(&self) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            notifier.notify(&cancel).await;
        });
    }
}

/// Wait for the current child to exit; pends forever while there is none.
async fn wait_running(current: &mut Option<RunningProcess>) -> std::io::Result<ExitStatus> {
    match current.as_mut() {
        Some(process) => process.child.wait().await,
        None => std::future::pending().await,
    }
}

/// Log how the instance ended. Exits never trigger a restart by themselves.
async fn report_exit(process: RunningProcess, status: std::io::Result<ExitStatus>) {
    let captured = match process.stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    match status {
        Ok(status) if status.success() => {
            info!(pid = ?process.pid, uptime = ?process.started_at.elapsed(), "process exited");
        }
        Ok(status) => {
            let stderr = String::from_utf8_lossy(&captured);
            error!(
                pid = ?process.pid,
                "process exited with {status}: {}",
                stderr.trim()
            );
        }
        Err(err) => warn!("waiting for process: {err}"),
    }
}
