use crate::data::RuntimeKind;
use crate::orchestrator::RuntimeMode;
use crate::telemetry::{self, TailerConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Telemetry directory; defaults to `telemetry::telemetry_dir()`
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_creation_poll_interval_ms")]
    pub creation_poll_interval_ms: u64,
    #[serde(default = "default_creation_timeout_secs")]
    pub creation_timeout_secs: u64,
    #[serde(default = "default_runtime")]
    pub runtime: RuntimeKind,
}

fn default_poll_interval_ms() -> u64 {
    telemetry::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_creation_poll_interval_ms() -> u64 {
    telemetry::DEFAULT_CREATION_POLL_INTERVAL.as_millis() as u64
}

fn default_creation_timeout_secs() -> u64 {
    telemetry::DEFAULT_CREATION_TIMEOUT.as_secs()
}

fn default_runtime() -> RuntimeKind {
    RuntimeKind::Pi
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            poll_interval_ms: default_poll_interval_ms(),
            creation_poll_interval_ms: default_creation_poll_interval_ms(),
            creation_timeout_secs: default_creation_timeout_secs(),
            runtime: default_runtime(),
        }
    }
}

impl TelemetryConfig {
    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            dir: self.dir.clone().unwrap_or_else(telemetry::telemetry_dir),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            creation_poll_interval: Duration::from_millis(self.creation_poll_interval_ms),
            creation_timeout: Duration::from_secs(self.creation_timeout_secs),
            runtime: self.runtime,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub mode: RuntimeMode,
}

pub fn config_dir() -> Result<PathBuf> {
    let dir = directories::ProjectDirs::from("", "", "telemux")
        .context("Could not determine config directory")?
        .config_dir()
        .to_path_buf();
    Ok(dir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration. A missing default file means defaults; a missing
/// explicit path is an error.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path()?, false),
    };

    if !path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", path.display());
        }
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    parse(&content).with_context(|| format!("Failed to parse config from {}", path.display()))
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Write a default config file, refusing to overwrite an existing one
pub fn init(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if path.exists() {
        anyhow::bail!("Config already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(path)
}
