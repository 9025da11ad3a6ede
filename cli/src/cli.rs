//! Command line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "refresh",
    version,
    about = "Builds and (re)starts your Go application every time you save a watched file."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use delve to debug the app (disables rebuild-on-change).
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Verbosity of log output: 0=fatal, 1=error, 2=warn, 3=info, 4=debug.
    #[arg(short, long, global = true, default_value_t = 3)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// (default) Watch your files and rebuild/restart your app accordingly.
    #[command(visible_aliases = ["r", "start", "build", "watch"])]
    Run,

    /// Generate a default configuration file.
    Init,
}
