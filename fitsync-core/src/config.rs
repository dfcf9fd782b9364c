//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/fitsync/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/fitsync/` (~/.config/fitsync/)
//! - Data: `$XDG_DATA_HOME/fitsync/` (~/.local/share/fitsync/)
//! - State/Logs: `$XDG_STATE_HOME/fitsync/` (~/.local/state/fitsync/)
//!
//! Nothing here is global: the loaded [`Config`] is handed to each
//! component when it is constructed.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Raw day archive location (required for syncing)
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,

    /// Database location override
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Ingestion policy
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the downloaded day folders live.
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Directory containing one `YYYY-MM-DD` folder per day
    pub root: PathBuf,
    /// Resume point used when the database holds no heart-rate samples
    pub start_date: NaiveDate,
}

/// Database configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DatabaseConfig {
    /// Override for the SQLite file (defaults to [`Config::database_path`])
    pub path: Option<PathBuf>,
}

/// When normalized records are committed to the sink.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// One transaction for the whole run
    #[default]
    Run,
    /// One transaction per day folder
    Day,
}

/// What to do with a candidate day that is not fully downloaded.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IncompletePolicy {
    /// Abort the run before anything is written
    #[default]
    Abort,
    /// Log it, leave it for a later run, and continue
    Skip,
}

/// Ingestion policy
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct IngestConfig {
    #[serde(default)]
    pub commit: CommitMode,

    #[serde(default)]
    pub on_incomplete: IncompletePolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,

    /// Echo warnings (skipped folders, incomplete days) on stderr
    #[serde(default = "default_stderr_warnings")]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
            stderr: default_stderr_warnings(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

fn default_stderr_warnings() -> bool {
    true
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// The archive section, which every sync needs.
    pub fn archive(&self) -> Result<&ArchiveConfig> {
        let archive = self.archive.as_ref().ok_or_else(|| {
            Error::Config("[archive] section with root and start_date is required".to_string())
        })?;
        if archive.root.as_os_str().is_empty() {
            return Err(Error::Config("archive.root must not be empty".to_string()));
        }
        Ok(archive)
    }

    /// Database file to open: the configured override or the XDG default.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/fitsync/config.toml` (~/.config/fitsync/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("fitsync").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/fitsync/` (~/.local/share/fitsync/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("fitsync")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/fitsync/` (~/.local/state/fitsync/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("fitsync")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/fitsync/data.db` (~/.local/share/fitsync/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/fitsync/fitsync.log` (~/.local/state/fitsync/fitsync.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("fitsync.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
