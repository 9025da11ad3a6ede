//! Stream bindings for spawned processes.

use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::ChildStderr;
use tokio::task::JoinHandle;
use tracing::warn;

/// Where a standard stream of the build or supervised process is bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StdioBinding {
    /// Use the refresh process's own stream.
    #[default]
    Inherit,

    /// Discard (or provide nothing, for stdin).
    Null,

    /// Read from / append to a file.
    File(PathBuf),
}

impl StdioBinding {
    /// Binding for a child's stdin.
    pub(crate) fn reader(&self) -> std::io::Result<Stdio> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::Null => Ok(Stdio::null()),
            Self::File(path) => Ok(std::fs::File::open(path)?.into()),
        }
    }

    /// Binding for a child's stdout.
    pub(crate) fn writer(&self) -> std::io::Result<Stdio> {
        match self {
            Self::Inherit => Ok(Stdio::inherit()),
            Self::Null => Ok(Stdio::null()),
            Self::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                Ok(file.into())
            }
        }
    }
}

/// Stream bindings applied to both the build and the run phase.
#[derive(Debug, Clone, Default)]
pub struct StdioConfig {
    pub stdin: StdioBinding,
    pub stdout: StdioBinding,
    pub stderr: StdioBinding,
}

/// Forward a child's stderr to its configured sink while keeping a copy.
///
/// The returned handle resolves to the captured bytes once the child closes
/// the stream, so failures can be reported with their error output.
pub(crate) fn spawn_stderr_tee(
    mut stderr: ChildStderr,
    binding: StdioBinding,
) -> JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut captured = Vec::new();
        let mut sink = stderr_sink(&binding).await;
        let mut buf = [0u8; 8192];

        loop {
            match stderr.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    captured.extend_from_slice(&buf[..n]);
                    if let Some(sink) = sink.as_mut() {
                        let _ = sink.write_all(&buf[..n]).await;
                        let _ = sink.flush().await;
                    }
                }
            }
        }

        captured
    })
}

async fn stderr_sink(binding: &StdioBinding) -> Option<Pin<Box<dyn AsyncWrite + Send>>> {
    match binding {
        StdioBinding::Inherit => Some(Box::pin(tokio::io::stderr())),
        StdioBinding::Null => None,
        StdioBinding::File(path) => {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await;
            match file {
                Ok(file) => Some(Box::pin(file)),
                Err(err) => {
                    warn!(path = %path.display(), "opening stderr sink: {err}");
                    None
                }
            }
        }
    }
}
