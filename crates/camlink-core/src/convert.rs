// ── API-to-domain conversions ──
//
// Bridges raw `camlink-api` wire types into domain types and back.

use camlink_api::{DeviceAddress, DeviceInfo, PreviewRequest, RecordRequest};

use crate::model::{CameraInfo, OperationalStatus};
use crate::settings::Settings;

impl CameraInfo {
    pub fn from_device(address: DeviceAddress, info: DeviceInfo, status: OperationalStatus) -> Self {
        Self {
            address,
            model: info.model,
            firmware: info.firmware,
            battery_percent: info.battery_percent,
            status,
        }
    }
}

impl From<&Settings> for PreviewRequest {
    fn from(settings: &Settings) -> Self {
        Self {
            resolution: settings.resolution.to_string(),
        }
    }
}

impl From<&Settings> for RecordRequest {
    fn from(settings: &Settings) -> Self {
        Self {
            resolution: settings.resolution.to_string(),
            quality: settings.quality.to_string(),
            mode: settings.mode.to_string(),
        }
    }
}
