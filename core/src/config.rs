//! Resolved configuration consumed by the rebuild loop.

use std::path::PathBuf;
use std::time::Duration;

use crate::stdio::StdioConfig;

/// Fully resolved configuration.
///
/// Produced by an external loader (the CLI crate); the core consumes it
/// read-only. The one exception is the manager prepending live-reload
/// entries to its own clone of `command_env` before the first start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory to watch and build from.
    pub app_root: PathBuf,

    /// Folder names directly under the root whose contents never trigger a
    /// rebuild.
    pub ignored_folders: Vec<String>,

    /// File extensions (with leading dot) that trigger a rebuild.
    pub included_extensions: Vec<String>,

    /// Package or file argument passed to `go build`. Empty means the
    /// module in the current directory.
    pub build_target_path: String,

    /// Directory the built binary is placed in.
    pub build_path: PathBuf,

    /// File name of the built binary.
    pub binary_name: String,

    /// Extra flags passed to `go build`.
    pub build_flags: Vec<String>,

    /// Flags passed to the supervised process.
    pub command_flags: Vec<String>,

    /// `KEY=value` environment entries for the supervised process. These
    /// take precedence over the inherited environment.
    pub command_env: Vec<String>,

    /// Debounce window applied to bursts of change events.
    pub build_delay: Duration,

    /// Run the built binary under `dlv exec` and disable rebuild-on-change.
    pub debug: bool,

    /// Serve the live reload event stream.
    pub live_reload: bool,

    /// URL polled until it answers 200 before a reload is announced.
    pub readiness_url: Option<String>,

    /// Stream bindings for the build and run phases.
    pub stdio: StdioConfig,
}

impl Config {
    /// Full path of the built binary.
    pub fn full_build_path(&self) -> PathBuf {
        self.build_path.join(&self.binary_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_root: PathBuf::from("."),
            ignored_folders: [
                "vendor",
                "log",
                "logs",
                "tmp",
                "node_modules",
                "bin",
                "templates",
            ]
            .map(String::from)
            .to_vec(),
            included_extensions: vec![".go".to_string()],
            build_target_path: String::new(),
            build_path: std::env::temp_dir(),
            binary_name: "refresh-build".to_string(),
            build_flags: Vec::new(),
            command_flags: Vec::new(),
            command_env: Vec::new(),
            build_delay: Duration::from_millis(100),
            debug: false,
            live_reload: false,
            readiness_url: None,
            stdio: StdioConfig::default(),
        }
    }
}
