//! Configuration file loading, defaulting and scaffolding.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Discovery order when no explicit config path is given.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    ".refresh.yml",
    ".refresh.yaml",
    "refresh.yml",
    "refresh.yaml",
];

/// Configuration as written in `refresh.yml`.
///
/// Every field has a default so a partial (or missing) file works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub app_root: PathBuf,
    pub ignored_folders: Vec<String>,
    pub included_extensions: Vec<String>,
    pub build_target_path: String,
    pub build_path: PathBuf,
    /// Debounce window in milliseconds.
    pub build_delay: u64,
    pub binary_name: String,
    pub build_flags: Vec<String>,
    pub command_flags: Vec<String>,
    pub command_env: Vec<String>,
    pub enable_colors: bool,
    pub live_reload: bool,
    pub readiness_url: Option<String>,
}

impl Default for FileConfig {
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
            build_delay: 100,
            binary_name: "refresh-build".to_string(),
            build_flags: Vec::new(),
            command_flags: Vec::new(),
            command_env: Vec::new(),
            enable_colors: true,
            live_reload: false,
            readiness_url: None,
        }
    }
}

impl FileConfig {
    /// Produce the resolved configuration the core consumes.
    pub fn resolve(self, debug: bool) -> refresh_core::Config {
        refresh_core::Config {
            app_root: self.app_root,
            ignored_folders: self.ignored_folders,
            included_extensions: self.included_extensions,
            build_target_path: self.build_target_path,
            build_path: self.build_path,
            binary_name: self.binary_name,
            build_flags: self.build_flags,
            command_flags: self.command_flags,
            command_env: self.command_env,
            build_delay: Duration::from_millis(self.build_delay),
            debug,
            live_reload: self.live_reload,
            readiness_url: self.readiness_url,
            stdio: refresh_core::StdioConfig::default(),
        }
    }
}

/// Load the configuration.
///
/// An explicit path must exist and parse. Otherwise the file names in
/// [`CONFIG_FILE_NAMES`] are tried under `base`; if none exists the defaults
/// are returned with no source path.
pub fn load(explicit: Option<&Path>, base: &Path) -> anyhow::Result<(FileConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = read_config(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }

    for name in CONFIG_FILE_NAMES {
        let path = base.join(name);
        if !path.exists() {
            continue;
        }
        let config = read_config(&path)?;
        return Ok((config, Some(path)));
    }

    Ok((FileConfig::default(), None))
}

fn read_config(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))
}

/// Write the default configuration for `refresh init`.
///
/// Refuses to overwrite an existing file.
pub fn write_default(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!(
            "config file {} already exists, skipping init",
            path.display()
        );
    }

    let yaml = serde_yaml::to_string(&FileConfig::default())
        .context("serializing default configuration")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("writing config file {}", path.display()))?;
    Ok(())
}
