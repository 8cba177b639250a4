// ── Session domain model ──
//
// Immutable views of the session handed to the presentation layer.
// Nothing here performs I/O; the session builds these under its lock.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use camlink_api::{DeviceAddress, StreamLocator};

use crate::settings::Settings;

/// Connection lifecycle of the single device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// `uncertain` is set when a stop-record was sent but never
    /// acknowledged: the camera may or may not still be recording.
    Recording { uncertain: bool },
}

impl ConnectionState {
    pub fn is_recording(self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Connected or recording: a `CameraInfo` is held and commands may be sent.
    pub fn is_established(self) -> bool {
        matches!(self, Self::Connected | Self::Recording { .. })
    }

    pub fn is_uncertain(self) -> bool {
        matches!(self, Self::Recording { uncertain: true })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Recording { uncertain: false } => "recording",
            Self::Recording { uncertain: true } => "recording (stop unconfirmed)",
        })
    }
}

/// What the camera is doing, as far as the session knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationalStatus {
    Connected,
    Recording,
}

/// Metadata of the connected camera.
///
/// Created on connect, replaced wholesale on refresh, dropped on disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraInfo {
    pub address: DeviceAddress,
    pub model: String,
    pub firmware: String,
    pub battery_percent: u8,
    pub status: OperationalStatus,
}

/// Caller-issued request to change session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Intent {
    Connect,
    ScanAndConnect,
    StartPreview,
    StopPreview,
    StartRecording,
    StopRecording,
    Disconnect,
    UpdateSettings,
    RefreshInfo,
    Reconnect,
}

/// Point-in-time view of the session, published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Bumped on every publish; lets subscribers detect missed updates.
    pub revision: u64,
    pub state: ConnectionState,
    pub camera: Option<CameraInfo>,
    pub settings: Settings,
    pub preview: Option<StreamLocator>,
    pub last_error: Option<String>,
    /// Previously connected addresses, most recent first.
    pub known_addresses: Vec<DeviceAddress>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn address(&self) -> Option<&DeviceAddress> {
        self.camera.as_ref().map(|c| &c.address)
    }

    /// Both session invariants:
    /// recording implies connected, and camera info is present exactly
    /// while the session is established.
    pub fn invariants_hold(&self) -> bool {
        let recording_ok = !self.is_recording() || self.state != ConnectionState::Disconnected;
        let camera_ok = self.camera.is_some() == self.state.is_established();
        let status_ok = self.camera.as_ref().is_none_or(|c| {
            (c.status == OperationalStatus::Recording) == self.state.is_recording()
        });
        recording_ok && camera_ok && status_ok
    }
}
