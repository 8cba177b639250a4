//! Configuration for the camlink CLI.
//!
//! TOML config (file + `CAMLINK_*` environment), the persisted list of
//! previously-seen camera addresses, and translation to
//! `camlink_core::SessionConfig`. The session itself never touches the
//! filesystem; everything it needs is handed in from here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use camlink_core::config::{self as core_config, MAX_KNOWN_ADDRESSES};
use camlink_core::{DeviceAddress, SessionConfig, Settings, SettingsPatch, StreamTemplate};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Camera to use when a command is given no address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Stream URL pattern; `{host}`, `{port}` and `{address}` are substituted.
    #[serde(default = "default_stream_template")]
    pub stream_url_template: String,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub scan: ScanSection,

    /// Settings in effect when a session starts.
    #[serde(default)]
    pub settings: SettingsSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: None,
            stream_url_template: default_stream_template(),
            timeouts: Timeouts::default(),
            scan: ScanSection::default(),
            settings: SettingsSection::default(),
        }
    }
}

/// Per-request bounds, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Timeouts {
    #[serde(default = "default_info_ms")]
    pub info_ms: u64,

    #[serde(default = "default_command_ms")]
    pub command_ms: u64,

    #[serde(default = "default_scan_attempt_ms")]
    pub scan_attempt_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            info_ms: default_info_ms(),
            command_ms: default_command_ms(),
            scan_attempt_ms: default_scan_attempt_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanSection {
    #[serde(default = "default_factory_address")]
    pub factory_address: String,

    #[serde(default = "default_subnet_defaults")]
    pub subnet_defaults: Vec<String>,

    /// When non-empty, replaces the default candidate order entirely.
    #[serde(default)]
    pub candidates: Vec<String>,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            factory_address: default_factory_address(),
            subnet_defaults: default_subnet_defaults(),
            candidates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SettingsSection {
    #[serde(default = "default_resolution")]
    pub resolution: String,

    #[serde(default = "default_quality")]
    pub quality: String,

    #[serde(default = "default_mode")]
    pub mode: String,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            quality: default_quality(),
            mode: default_mode(),
        }
    }
}

fn default_stream_template() -> String {
    StreamTemplate::default().as_str().to_owned()
}
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
fn default_info_ms() -> u64 {
    millis(core_config::DEFAULT_INFO_TIMEOUT)
}
fn default_command_ms() -> u64 {
    millis(core_config::DEFAULT_COMMAND_TIMEOUT)
}
fn default_scan_attempt_ms() -> u64 {
    millis(core_config::DEFAULT_SCAN_ATTEMPT_TIMEOUT)
}
fn default_factory_address() -> String {
    core_config::factory_address().to_string()
}
fn default_subnet_defaults() -> Vec<String> {
    core_config::subnet_defaults()
        .iter()
        .map(ToString::to_string)
        .collect()
}
fn default_resolution() -> String {
    Settings::default().resolution.to_string()
}
fn default_quality() -> String {
    Settings::default().quality.to_string()
}
fn default_mode() -> String {
    Settings::default().mode.to_string()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "camlink", "camlink")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("camlink");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Resolve the state file holding previously-seen addresses.
pub fn state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state.toml"),
        |dirs| dirs.data_dir().join("state.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file is not an error.
///
/// Environment keys nest with `__`: `CAMLINK_TIMEOUTS__INFO_MS=500`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to the session ──────────────────────────────────────

impl Config {
    /// The configured default device address, if any.
    pub fn default_address(&self) -> Result<Option<DeviceAddress>, ConfigError> {
        self.address
            .as_deref()
            .map(|a| parse_address("address", a))
            .transpose()
    }

    /// The custom scan order, if one is configured.
    pub fn scan_candidates(&self) -> Result<Option<Vec<DeviceAddress>>, ConfigError> {
        if self.scan.candidates.is_empty() {
            return Ok(None);
        }
        parse_addresses("scan.candidates", &self.scan.candidates).map(Some)
    }

    /// Validate the `[settings]` section.
    pub fn initial_settings(&self) -> Result<Settings, ConfigError> {
        let patch = SettingsPatch::default()
            .with_resolution(&self.settings.resolution)
            .with_quality(&self.settings.quality)
            .with_mode(&self.settings.mode);

        Settings::default()
            .merged(&patch)
            .map_err(|e| ConfigError::Validation {
                field: "settings".into(),
                reason: e.to_string(),
            })
    }
}

/// Build a `SessionConfig` from the loaded config and remembered addresses.
pub fn to_session_config(
    cfg: &Config,
    known_addresses: &[DeviceAddress],
) -> Result<SessionConfig, ConfigError> {
    Ok(SessionConfig {
        info_timeout: timeout("timeouts.info_ms", cfg.timeouts.info_ms)?,
        command_timeout: timeout("timeouts.command_ms", cfg.timeouts.command_ms)?,
        scan_attempt_timeout: timeout("timeouts.scan_attempt_ms", cfg.timeouts.scan_attempt_ms)?,
        factory_address: parse_address("scan.factory_address", &cfg.scan.factory_address)?,
        subnet_defaults: parse_addresses("scan.subnet_defaults", &cfg.scan.subnet_defaults)?,
        known_addresses: known_addresses.to_vec(),
        settings: cfg.initial_settings()?,
        stream_template: StreamTemplate::new(&cfg.stream_url_template),
        ..SessionConfig::default()
    })
}

fn timeout(field: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn parse_address(field: &str, input: &str) -> Result<DeviceAddress, ConfigError> {
    DeviceAddress::parse(input).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: e.to_string(),
    })
}

fn parse_addresses(field: &str, inputs: &[String]) -> Result<Vec<DeviceAddress>, ConfigError> {
    inputs.iter().map(|a| parse_address(field, a)).collect()
}

// ── Remembered addresses ────────────────────────────────────────────

/// Persisted between runs: addresses that answered before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct State {
    /// Most recent first.
    #[serde(default)]
    pub known_addresses: Vec<DeviceAddress>,
}

impl State {
    /// Move `address` to the front, dropping the oldest past the cap.
    pub fn remember(&mut self, address: &DeviceAddress) {
        self.known_addresses.retain(|a| a != address);
        self.known_addresses.insert(0, address.clone());
        self.known_addresses.truncate(MAX_KNOWN_ADDRESSES);
    }
}

/// Load state from the canonical path, or an empty state on any failure.
pub fn load_state_or_default() -> State {
    load_state_from(&state_path()).unwrap_or_default()
}

/// Load state from `path`. A missing file yields an empty state.
pub fn load_state_from(path: &Path) -> Result<State, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(State::default()),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_state(state: &State) -> Result<(), ConfigError> {
    save_state_to(state, &state_path())
}

pub fn save_state_to(state: &State, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(state)?)?;
    Ok(())
}
