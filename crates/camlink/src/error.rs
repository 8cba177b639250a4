//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and a stable exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use camlink_config::ConfigError;
use camlink_core::settings::allowed_values;
use camlink_core::{AttemptOutcome, CoreError, FailureKind};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const DEVICE_REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const RECORDING_UNCERTAIN: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to camera at {address}")]
    #[diagnostic(
        code(camlink::connection_failed),
        help(
            "Check that this machine is on the camera's Wi-Fi network.\n\
             Cause: {reason}\n\
             Try: camlink scan"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("Camera unreachable during {action}")]
    #[diagnostic(code(camlink::unreachable), help("Cause: {reason}"))]
    Unreachable { action: String, reason: String },

    #[error("No camera found after probing {tried} address(es)")]
    #[diagnostic(
        code(camlink::no_device_found),
        help(
            "Join the camera's access point, or pass its address explicitly.\n\
             Probed:\n{detail}"
        )
    )]
    NoDeviceFound { tried: usize, detail: String },

    // ── Device responses ─────────────────────────────────────────────
    #[error("Camera did not answer {action} in time")]
    #[diagnostic(
        code(camlink::timeout),
        help(
            "The command may still have taken effect on the camera.\n\
             Increase the bound with --info-timeout / --command-timeout."
        )
    )]
    Timeout { action: String, reason: String },

    #[error("Camera rejected {action}")]
    #[diagnostic(code(camlink::device_rejected), help("{reason}"))]
    DeviceRejected { action: String, reason: String },

    #[error("Unexpected response to {action}")]
    #[diagnostic(
        code(camlink::unexpected_response),
        help("The device at this address may not be a supported camera.\n{reason}")
    )]
    UnexpectedResponse { action: String, reason: String },

    #[error("Stop was not confirmed; the camera may still be recording")]
    #[diagnostic(
        code(camlink::recording_uncertain),
        help(
            "Check the camera, then stop again from `camlink shell`.\n\
             Cause: {reason}"
        )
    )]
    RecordingUncertain { reason: String },

    #[error("{action} was interrupted by a disconnect")]
    #[diagnostic(code(camlink::interrupted))]
    Interrupted { action: String },

    // ── Usage ────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(camlink::illegal_state))]
    IllegalState { message: String },

    #[error("Invalid value '{value}' for setting '{field}'")]
    #[diagnostic(code(camlink::invalid_setting), help("Allowed: {allowed}"))]
    InvalidSetting {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(camlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(camlink::config_exists),
        help("Use --force to overwrite.\nPath: {path}")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(camlink::config))]
    Config(#[from] ConfigError),

    #[error("{message}")]
    #[diagnostic(code(camlink::setup))]
    Setup { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::NoDeviceFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::DeviceRejected { .. } => exit_code::DEVICE_REJECTED,
            Self::RecordingUncertain { .. } => exit_code::RECORDING_UNCERTAIN,
            Self::IllegalState { .. }
            | Self::InvalidSetting { .. }
            | Self::Validation { .. }
            | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Classify a device failure raised while performing `action`.
    fn device(action: &str, kind: FailureKind, reason: String) -> Self {
        let action = action.to_owned();
        match kind {
            FailureKind::Timeout => Self::Timeout { action, reason },
            FailureKind::Rejected => Self::DeviceRejected { action, reason },
            FailureKind::Malformed => Self::UnexpectedResponse { action, reason },
            FailureKind::Unreachable => Self::Unreachable { action, reason },
            FailureKind::Local => Self::Setup { message: reason },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { address, source } => match source.kind() {
                FailureKind::Timeout => CliError::Timeout {
                    action: format!("connect to {address}"),
                    reason: source.to_string(),
                },
                _ => CliError::ConnectionFailed {
                    address,
                    reason: source.to_string(),
                },
            },

            CoreError::NoDeviceFound { attempts } => {
                let detail = attempts
                    .iter()
                    .map(|a| match &a.outcome {
                        AttemptOutcome::Found => format!("  {}: found", a.address),
                        AttemptOutcome::Failed { kind, .. } => format!("  {}: {kind}", a.address),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                CliError::NoDeviceFound {
                    tried: attempts.len(),
                    detail,
                }
            }

            CoreError::PreviewUnavailable { source } => {
                CliError::device("start-preview", source.kind(), source.to_string())
            }
            CoreError::RecordingFailed { source } => {
                CliError::device("start-record", source.kind(), source.to_string())
            }
            CoreError::InfoRefreshFailed { source } => {
                CliError::device("camera-info", source.kind(), source.to_string())
            }

            CoreError::StopRecordingFailed { source } => CliError::RecordingUncertain {
                reason: source.to_string(),
            },

            CoreError::InvalidSetting { field, value } => {
                let allowed = allowed_values(&field).map_or_else(
                    || "resolution, quality, mode".to_owned(),
                    |values| values.join(", "),
                );
                CliError::InvalidSetting {
                    field,
                    value,
                    allowed,
                }
            }

            err @ CoreError::IllegalTransition { .. } => CliError::IllegalState {
                message: err.to_string(),
            },

            CoreError::Superseded { intent } => CliError::Interrupted {
                action: intent.to_string(),
            },

            CoreError::InvalidAddress { input, reason } => CliError::Validation {
                field: "address".into(),
                reason: format!("'{input}': {reason}"),
            },

            CoreError::Setup { message } => CliError::Setup { message },
        }
    }
}
