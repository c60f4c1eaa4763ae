//! # Configuration Module
//!
//! This module aggregates every tunable of the decision core and handles
//! persistence in the platform-appropriate data directory.
//!
//! ## Data Storage
//!
//! Encore stores its configuration in the platform-standard data directory:
//! - Linux: `~/.local/share/encore/`
//! - macOS: `~/Library/Application Support/encore/`
//! - Windows: `%APPDATA%\encore\`
//!
//! ## Layout
//!
//! [`EngineConfig`] groups the three parameter sets one engine instance
//! needs: the filter pipeline settings, the probability modifiers and the
//! statistics-update thresholds. Each set keeps its own defaults, so a
//! partial configuration file (or none at all) yields a fully working
//! engine.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::filter::FilterConfig;
use crate::select::ProbabilityConfig;
use crate::stats::StatsConfig;

/// All tunables of one engine instance.
///
/// Missing fields deserialize to their defaults, so configuration files can
/// name only the values they change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Filter pipeline parameters.
    pub filter: FilterConfig,
    /// Probability (entry distribution) parameters.
    pub probability: ProbabilityConfig,
    /// Statistics-update thresholds.
    pub stats: StatsConfig,
}

impl EngineConfig {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads the configuration from the default location, falling back to
    /// the built-in defaults when no file exists yet.
    pub fn load_default() -> Result<Self> {
        let path = get_config_path()?;

        if path.exists() {
            Self::load(&path)
        } else {
            info!("No configuration file at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .context("Failed to serialize the configuration")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write configuration file {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }
}

/// Returns the platform-appropriate configuration file path.
///
/// Locates the standard data directory for the current platform and creates
/// the `encore` subdirectory if it doesn't exist, so the file can be
/// written without further setup.
///
/// # Errors
///
/// Returns an error if the system data directory cannot be determined or
/// the subdirectory cannot be created.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// Returns the platform-appropriate data directory for Encore, creating it
/// if necessary. Also used for the default library file location.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!("Could not determine system data directory for this platform")
    })?;

    let encore_dir = data_dir.join("encore");
    fs::create_dir_all(&encore_dir).with_context(|| {
        format!("Failed to create data directory at {}", encore_dir.display())
    })?;

    Ok(encore_dir)
}
