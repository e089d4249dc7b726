//! Configuration management for nixdecl
//!
//! Handles loading, saving, and default configuration values.
//! Config file location: ~/.config/nixdecl/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fallback location of the Nix tools on multi-user installs
pub const DEFAULT_NIX_BIN_DIR: &str = "/nix/var/nix/profiles/default/bin";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Searched before PATH when locating the Nix tools
    pub search_dirs: Vec<PathBuf>,
    pub channel_binary: String,
    pub env_binary: String,
    /// Environment variable that points nix-env at the config override file
    pub config_env_var: String,
    /// Leave generated expression and config files behind after a run
    pub keep_generated_files: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_dirs: vec![PathBuf::from(DEFAULT_NIX_BIN_DIR)],
            channel_binary: "nix-channel".to_string(),
            env_binary: "nix-env".to_string(),
            config_env_var: "NIXPKGS_CONFIG".to_string(),
            keep_generated_files: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("nixdecl");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }
}
