// ── Core error types ──
//
// Session-level errors. Network failures arrive from `camlink-api` already
// classified; each intent wraps them in the variant that says what the
// failure means for the session, keeping the api error as `source`.

use thiserror::Error;

use camlink_api::FailureKind;

use crate::model::{ConnectionState, Intent};
use crate::scanner::ScanAttempt;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to camera at {address}: {source}")]
    ConnectionFailed {
        address: String,
        source: camlink_api::Error,
    },

    #[error("No camera responded on {} candidate address(es)", .attempts.len())]
    NoDeviceFound { attempts: Vec<ScanAttempt> },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Preview unavailable: {source}")]
    PreviewUnavailable { source: camlink_api::Error },

    #[error("Recording did not start: {source}")]
    RecordingFailed { source: camlink_api::Error },

    /// Stop was sent but not confirmed; the session stays in
    /// `Recording { uncertain: true }` until a stop succeeds.
    #[error("Stop not confirmed, camera may still be recording: {source}")]
    StopRecordingFailed { source: camlink_api::Error },

    #[error("Camera info refresh failed: {source}")]
    InfoRefreshFailed { source: camlink_api::Error },

    // ── Usage errors ─────────────────────────────────────────────────
    #[error("Invalid value '{value}' for setting '{field}'")]
    InvalidSetting { field: String, value: String },

    #[error("Cannot {intent} while {state}")]
    IllegalTransition {
        intent: Intent,
        state: ConnectionState,
    },

    /// A disconnect arrived while this intent was waiting on the device;
    /// its result was discarded.
    #[error("{intent} was superseded by a disconnect")]
    Superseded { intent: Intent },

    #[error("Invalid device address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    // ── Setup errors ─────────────────────────────────────────────────
    #[error("Session setup failed: {message}")]
    Setup { message: String },
}

impl CoreError {
    /// The wrapped network failure class, if this error came from the device.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.network_source().map(camlink_api::Error::kind)
    }

    fn network_source(&self) -> Option<&camlink_api::Error> {
        match self {
            Self::ConnectionFailed { source, .. }
            | Self::PreviewUnavailable { source }
            | Self::RecordingFailed { source }
            | Self::StopRecordingFailed { source }
            | Self::InfoRefreshFailed { source } => Some(source),
            _ => None,
        }
    }

    /// Returns `true` if re-issuing the same intent could succeed.
    ///
    /// Never `true` for `RecordingFailed` after a timeout: the camera may
    /// already be recording, and a blind retry would start a second take.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RecordingFailed { source } => {
                source.is_transient() && !source.is_ambiguous()
            }
            Self::NoDeviceFound { .. } => true,
            other => other.network_source().is_some_and(camlink_api::Error::is_transient),
        }
    }

    /// Programming/usage errors: the intent was never sent to the device.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSetting { .. } | Self::IllegalTransition { .. } | Self::InvalidAddress { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

/// Only for failures raised outside an intent (address parsing, client
/// construction). Intents map device failures explicitly.
impl From<camlink_api::Error> for CoreError {
    fn from(err: camlink_api::Error) -> Self {
        match err {
            camlink_api::Error::InvalidAddress { input, reason } => {
                CoreError::InvalidAddress { input, reason }
            }
            other => CoreError::Setup {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> camlink_api::Error {
        camlink_api::Error::Timeout {
            route: "POST /start-record".into(),
            timeout_ms: 5000,
        }
    }

    #[test]
    fn start_record_timeout_is_not_retryable() {
        let err = CoreError::RecordingFailed { source: timeout() };
        assert_eq!(err.failure_kind(), Some(FailureKind::Timeout));
        assert!(!err.is_retryable());
    }

    #[test]
    fn stop_record_timeout_is_retryable() {
        let err = CoreError::StopRecordingFailed { source: timeout() };
        assert!(err.is_retryable());
    }

    #[test]
    fn illegal_transition_message() {
        let err = CoreError::IllegalTransition {
            intent: Intent::StartRecording,
            state: ConnectionState::Disconnected,
        };
        assert_eq!(err.to_string(), "Cannot start-recording while disconnected");
        assert!(err.is_usage_error());
        assert_eq!(err.failure_kind(), None);
    }

    #[test]
    fn address_errors_convert() {
        let err: CoreError = camlink_api::DeviceAddress::parse("").unwrap_err().into();
        assert!(matches!(err, CoreError::InvalidAddress { .. }));
    }
}
