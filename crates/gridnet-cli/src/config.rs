//! Configuration file handling.
//! The default location is ~/.gridnet/config.toml

use anyhow::{anyhow, Context, Result};
use gridnet_solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GridnetConfig {
    /// Settings sent with load flow requests
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get the gridnet home directory (defaults to ~/.gridnet)
pub fn gridnet_home() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))
        .map(|h| h.join(".gridnet"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(gridnet_home()?.join("config.toml"))
}

pub fn parse_config(contents: &str) -> Result<GridnetConfig> {
    Ok(toml::from_str(contents)?)
}

/// Load the configuration.
///
/// An explicit path must exist. A missing default file means default settings.
pub fn load_config(path: Option<&Path>) -> Result<GridnetConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = default_config_path()?;
            if !default.exists() {
                return Ok(GridnetConfig::default());
            }
            default
        }
    };
    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading config {}", config_path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", config_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, GridnetConfig::default());
        assert_eq!(config.solver.max_iterations, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config("[solver]\nprecision = 1e-8\n\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.solver.precision, 1e-8);
        assert_eq!(config.solver.max_iterations, 20);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = GridnetConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse_config(&text).unwrap(), config);
    }
}
