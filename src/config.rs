//! Configuration for kubeprobe
//!
//! Settings are read from `~/.kubeprobe/config.toml` (or the file passed with
//! `--config`) and can be overridden by command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use kubeprobe_query::DispatcherConfig;
use kubeprobe_types::Encoding;

/// Get the base kubeprobe directory (~/.kubeprobe/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kubeprobe"))
        .context("Could not determine home directory")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kubeconfig context; inferred from the environment when unset
    pub context: Option<String>,
    /// Encoding of list results
    pub format: Encoding,
    /// Status for cluster errors that carry none
    pub default_error_status: u16,
    /// Report the API server's own status code when it gives one
    pub propagate_cluster_status: bool,
    /// Fallback log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let dispatcher = DispatcherConfig::default();
        Self {
            context: None,
            format: dispatcher.encoding,
            default_error_status: dispatcher.default_error_status,
            propagate_cluster_status: dispatcher.propagate_cluster_status,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load the config file.
    ///
    /// An explicit path must exist; the default path may be missing, in which
    /// case defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the config file path (~/.kubeprobe/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.toml"))
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            default_error_status: self.default_error_status,
            propagate_cluster_status: self.propagate_cluster_status,
            encoding: self.format,
        }
    }
}
