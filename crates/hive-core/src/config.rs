//! Configuration resolution for `HiVE`.
//!
//! Layers, lowest priority first:
//! 1. Built-in defaults
//! 2. Global config (`~/.config/hive/settings.json`)
//! 3. Project config (`.hive/settings.json`)
//! 4. Environment variables (`HIVE_*`)
//!
//! Binaries apply CLI flags on top of the loaded value.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete `HiVE` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provisioner: ProvisionerConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

/// HTTP API server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Where and how patiently to reach the environment provisioner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Create endpoint. Teardown requests go to `{endpoint}/delete`.
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ProvisionerConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/environment".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Environment readiness polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessConfig {
    pub interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl ReadinessConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            probe_timeout_secs: 5,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            merge_config(&mut config, load_config_file(&global_path)?);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".hive").join("settings.json");
        if project_path.exists() {
            merge_config(&mut config, load_config_file(&project_path)?);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Path of the global settings file.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Default database location when none is configured.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("hive.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".hive"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/hive"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("hive"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// A settings file as written: only the keys it sets are `Some`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    server: ServerOverlay,
    provisioner: ProvisionerOverlay,
    readiness: ReadinessOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerOverlay {
    listen_addr: Option<SocketAddr>,
    database_path: Option<PathBuf>,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProvisionerOverlay {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReadinessOverlay {
    interval_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<ConfigOverlay> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigOverlay) {
    let ConfigOverlay {
        server,
        provisioner,
        readiness,
    } = overlay;

    if let Some(addr) = server.listen_addr {
        base.server.listen_addr = addr;
    }
    if server.database_path.is_some() {
        base.server.database_path = server.database_path;
    }
    if let Some(level) = server.log_level {
        base.server.log_level = level;
    }

    if let Some(endpoint) = provisioner.endpoint {
        base.provisioner.endpoint = endpoint;
    }
    if let Some(secs) = provisioner.timeout_secs {
        base.provisioner.timeout_secs = secs;
    }

    if let Some(secs) = readiness.interval_secs {
        base.readiness.interval_secs = secs;
    }
    if let Some(secs) = readiness.probe_timeout_secs {
        base.readiness.probe_timeout_secs = secs;
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(addr) = var("HIVE_LISTEN_ADDR").and_then(|v| v.parse().ok()) {
        config.server.listen_addr = addr;
    }
    if let Some(path) = var("HIVE_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(path));
    }
    if let Some(level) = var("HIVE_LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(endpoint) = var("HIVE_PROVISIONER_URL") {
        config.provisioner.endpoint = endpoint;
    }
    if let Some(secs) = var("HIVE_PROVISIONER_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.provisioner.timeout_secs = secs;
    }
    if let Some(secs) = var("HIVE_POLL_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.readiness.interval_secs = secs;
    }
    if let Some(secs) = var("HIVE_PROBE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.readiness.probe_timeout_secs = secs;
    }
}
