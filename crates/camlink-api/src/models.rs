// Wire models for the camera control surface.
//
// `GET /camera-info` bodies come from assorted firmware builds and are
// frequently partial, so `DeviceInfo` is decoded field by field with
// fallbacks instead of through a strict serde derive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "Unknown Camera";
pub const DEFAULT_FIRMWARE: &str = "unknown";

/// Decoded `GET /camera-info` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub firmware: String,
    /// Battery charge, clamped to 0..=100.
    pub battery_percent: u8,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            firmware: DEFAULT_FIRMWARE.into(),
            battery_percent: 0,
        }
    }
}

impl DeviceInfo {
    /// Decode an info body. Missing or mistyped fields fall back to
    /// defaults; only a body that is not a JSON object is refused.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        Some(Self {
            model: text("model").unwrap_or_else(|| DEFAULT_MODEL.into()),
            firmware: text("firmware").unwrap_or_else(|| DEFAULT_FIRMWARE.into()),
            battery_percent: obj.get("battery").map_or(0, battery_from_value),
        })
    }
}

/// Accept `70`, `70.4`, and `"70"`; clamp out-of-range values.
fn battery_from_value(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };

    match raw {
        Some(v) if v.is_finite() => {
            let clamped = v.round().clamp(0.0, 100.0);
            // Clamped to 0..=100 above, so the narrowing is lossless.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
            let pct = clamped as u8;
            pct
        }
        _ => 0,
    }
}

/// Body of `POST /start-preview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub resolution: String,
}

/// Body of `POST /start-record`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRequest {
    pub resolution: String,
    pub quality: String,
    pub mode: String,
}

/// Positive acknowledgement of a command.
///
/// Firmware either sends an empty body or a small JSON document; the
/// latter is kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ack {
    pub body: Option<Value>,
}
