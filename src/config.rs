//! Configuration, persisted UI state and logging setup
//!
//! Both files are JSON under `~/.config/keyline/`. Missing files mean
//! defaults; every field is optional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;

use crate::engine::local::{EngineSettings, DEFAULT_KILL_RING_SIZE};

pub const DEFAULT_FONT_SIZE: u16 = 14;
pub const MIN_FONT_SIZE: u16 = 10;
pub const MAX_FONT_SIZE: u16 = 32;

const APP_DIR: &str = "keyline";
const CONFIG_FILE_NAME: &str = "config.json";
const STATE_FILE_NAME: &str = "state.json";
const LOG_FILE_NAME: &str = "keyline.log";

/// Clamp a font size into the supported range
pub fn clamp_font_size(size: i32) -> u16 {
    size.clamp(i32::from(MIN_FONT_SIZE), i32::from(MAX_FONT_SIZE)) as u16
}

/// `~/.config/keyline`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

pub fn default_state_path() -> PathBuf {
    config_dir().join(STATE_FILE_NAME)
}

/// `~/.cache/keyline/keyline.log`
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(LOG_FILE_NAME)
}

/// Configuration and state errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Logging error: {0}")]
    Logging(String),
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub font_size: u16,
    pub tab_width: usize,
    /// `tracing` filter directive, e.g. `info` or `keyline=debug`
    pub log_level: String,
    /// Where new files are saved; defaults to the home directory
    pub default_save_dir: Option<PathBuf>,
    pub kill_ring_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            tab_width: 4,
            log_level: "info".to_string(),
            default_save_dir: None,
            kill_ring_size: DEFAULT_KILL_RING_SIZE,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(target: "config", path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&json)?;
        info!(target: "config", path = %path.display(), "loaded config");
        Ok(config.normalized())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        write_json(path, self)
    }

    /// Clamp out-of-range values
    pub fn normalized(mut self) -> Self {
        self.font_size = clamp_font_size(i32::from(self.font_size));
        self.tab_width = self.tab_width.clamp(1, 16);
        self.kill_ring_size = self.kill_ring_size.max(1);
        self
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            kill_ring_size: self.kill_ring_size,
            default_save_dir: self.default_save_dir.clone(),
        }
    }
}

/// UI state remembered between sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    /// Last font size chosen with C-= / C--
    pub font_size: Option<u16>,
}

impl UiState {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        write_json(path, self)
    }

    /// Saved font size if any, else the configured one
    pub fn font_size_or(&self, configured: u16) -> u16 {
        clamp_font_size(i32::from(self.font_size.unwrap_or(configured)))
    }
}

/// Write JSON through a temp file and rename
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())?;
    Ok(())
}

/// Replace `path` with `bytes` via a sibling `.<name>.tmp` and a rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| APP_DIR.to_string());
    let temp_file = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp_file, bytes)?;
    if let Err(err) = fs::rename(&temp_file, path) {
        let _ = fs::remove_file(&temp_file);
        return Err(err);
    }
    Ok(())
}

/// Install a file-backed `tracing` subscriber.
///
/// The returned guard flushes the log on drop and must outlive the app.
pub fn init_logging(path: &Path, level: &str) -> Result<WorkerGuard, ConfigError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| ConfigError::Logging(format!("not a file path: {}", path.display())))?;

    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .map_err(|e| ConfigError::Logging(format!("bad log level '{}': {}", level, e)))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    Ok(guard)
}
