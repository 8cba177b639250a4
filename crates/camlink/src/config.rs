//! CLI configuration: a thin wrapper around `camlink_config`.
//!
//! Re-exports the shared types and layers the global timeout flags on top
//! of the file/env configuration.

use std::path::{Path, PathBuf};

use camlink_core::{DeviceAddress, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use camlink_config::{
    Config, State, config_path, load_config_from, load_state_or_default, save_config_to,
    save_state, state_path,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` if given, else the platform path.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load configuration from the active path and environment.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&active_config_path(global))?)
}

/// Translate config + remembered addresses + flags into a `SessionConfig`.
///
/// Flag overrides take priority over file and environment values.
pub fn session_config(
    global: &GlobalOpts,
    cfg: &Config,
    state: &State,
) -> Result<SessionConfig, CliError> {
    let mut session = camlink_config::to_session_config(cfg, &state.known_addresses)?;

    if let Some(d) = global.info_timeout {
        session.info_timeout = d.into();
    }
    if let Some(d) = global.command_timeout {
        session.command_timeout = d.into();
    }
    if let Some(d) = global.scan_timeout {
        session.scan_attempt_timeout = d.into();
    }
    Ok(session)
}

/// Parse a user-supplied device address.
pub fn parse_address(input: &str) -> Result<DeviceAddress, CliError> {
    DeviceAddress::parse(input).map_err(|e| CliError::Validation {
        field: "address".into(),
        reason: e.to_string(),
    })
}

/// Record a successful connection so the next scan tries it early.
///
/// Failing to persist is not fatal to the command that connected.
pub fn remember(address: &DeviceAddress) {
    let mut state = load_state_or_default();
    state.remember(address);
    if let Err(e) = save_state(&state) {
        tracing::warn!(error = %e, path = %state_path().display(), "could not save known addresses");
    }
}

pub fn display(path: &Path) -> String {
    path.display().to_string()
}
