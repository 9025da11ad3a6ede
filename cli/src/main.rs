//! The `refresh` binary: configuration, logging and signal wiring around the
//! core rebuild loop.

mod cli;
mod config;

use std::path::PathBuf;

use clap::Parser;
use refresh_core::Manager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Init) => init(&cli),
        Some(Command::Run) | None => run(&cli).await,
    }
}

fn init(cli: &Cli) -> anyhow::Result<()> {
    init_tracing(cli.verbosity, true);

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("refresh.yml"));
    config::write_default(&path)?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let base = std::env::current_dir()?;
    let (file_config, source) = config::load(cli.config.as_deref(), &base)?;
    init_tracing(cli.verbosity, file_config.enable_colors);

    match &source {
        Some(path) => debug!(config = %path.display(), "configuration loaded"),
        None => warn!("no configuration loaded, proceeding with defaults"),
    }

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let manager = Manager::new(file_config.resolve(cli.debug), cancel);
    manager.start().await?;
    Ok(())
}

/// Map the verbosity flag to a default filter, overridable via `RUST_LOG`.
fn init_tracing(verbosity: u8, ansi: bool) {
    let default_level = match verbosity {
        0 | 1 => "error",
        2 => "warn",
        3 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .init();
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            warn!("installing SIGTERM handler: {err}");
            let _ = ctrl_c.await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
