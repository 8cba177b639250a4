// ── Capture settings ──
//
// Validated configuration pushed to the camera on the next command that
// carries it. Settings live independently of the connection: they survive
// disconnect/reconnect and only change through an explicit user intent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CoreError;

/// Supported capture resolutions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum Resolution {
    #[strum(to_string = "3840x2160")]
    #[serde(rename = "3840x2160")]
    Uhd2160,
    #[strum(to_string = "2560x1440")]
    #[serde(rename = "2560x1440")]
    Qhd1440,
    #[strum(to_string = "1920x1440")]
    #[serde(rename = "1920x1440")]
    Fhd1440,
    #[strum(to_string = "1920x1080")]
    #[serde(rename = "1920x1080")]
    Fhd1080,
    #[strum(to_string = "1280x720")]
    #[serde(rename = "1280x720")]
    Hd720,
}

/// Encoder quality preset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Quality {
    High,
    Medium,
    Low,
}

/// Capture mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CaptureMode {
    Video,
    Photo,
    Timelapse,
}

/// Setting names accepted by [`SettingsPatch`].
pub const SETTING_FIELDS: [&str; 3] = ["resolution", "quality", "mode"];

/// A complete, always-valid set of capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    pub resolution: Resolution,
    pub quality: Quality,
    pub mode: CaptureMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Fhd1080,
            quality: Quality::High,
            mode: CaptureMode::Video,
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.resolution, self.quality, self.mode)
    }
}

impl Settings {
    /// Validate every field of `patch`, then return the merged settings.
    ///
    /// All-or-nothing: the first invalid field aborts and `self` is left
    /// untouched.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Self, CoreError> {
        let mut next = *self;
        if let Some(ref raw) = patch.resolution {
            next.resolution = parse_field("resolution", raw)?;
        }
        if let Some(ref raw) = patch.quality {
            next.quality = parse_field("quality", raw)?;
        }
        if let Some(ref raw) = patch.mode {
            next.mode = parse_field("mode", raw)?;
        }
        Ok(next)
    }
}

fn parse_field<T: FromStr>(field: &str, raw: &str) -> Result<T, CoreError> {
    raw.trim().parse().map_err(|_| CoreError::InvalidSetting {
        field: field.into(),
        value: raw.into(),
    })
}

/// Allowed values for a setting, for help text and error hints.
pub fn allowed_values(field: &str) -> Option<Vec<String>> {
    match field {
        "resolution" => Some(Resolution::iter().map(|r| r.to_string()).collect()),
        "quality" => Some(Quality::iter().map(|q| q.to_string()).collect()),
        "mode" => Some(CaptureMode::iter().map(|m| m.to_string()).collect()),
        _ => None,
    }
}

// ── Partial updates ─────────────────────────────────────────────────

/// Unvalidated partial update, as received from the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl SettingsPatch {
    pub fn with_resolution(mut self, value: impl Into<String>) -> Self {
        self.resolution = Some(value.into());
        self
    }

    pub fn with_quality(mut self, value: impl Into<String>) -> Self {
        self.quality = Some(value.into());
        self
    }

    pub fn with_mode(mut self, value: impl Into<String>) -> Self {
        self.mode = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.resolution.is_none() && self.quality.is_none() && self.mode.is_none()
    }

    /// Build a patch from `key=value` style pairs. Unknown keys are
    /// rejected rather than dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut patch = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref().trim() {
                "resolution" => patch.resolution = Some(value),
                "quality" => patch.quality = Some(value),
                "mode" => patch.mode = Some(value),
                other => {
                    return Err(CoreError::InvalidSetting {
                        field: other.into(),
                        value,
                    });
                }
            }
        }
        Ok(patch)
    }

    /// Build a patch from a JSON object such as `{"resolution":"1280x720"}`.
    ///
    /// Unknown keys and non-string values are reported per field.
    pub fn from_json(value: &Value) -> Result<Self, CoreError> {
        let obj = value.as_object().ok_or_else(|| CoreError::InvalidSetting {
            field: "settings".into(),
            value: value.to_string(),
        })?;

        let mut pairs = Vec::with_capacity(obj.len());
        for (key, raw) in obj {
            let text = raw.as_str().ok_or_else(|| CoreError::InvalidSetting {
                field: key.clone(),
                value: raw.to_string(),
            })?;
            pairs.push((key.as_str(), text.to_owned()));
        }
        Self::from_pairs(pairs)
    }
}

// ── Store ───────────────────────────────────────────────────────────

/// Validated mutable settings record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsStore {
    current: Settings,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> Settings {
        self.current
    }

    /// Apply a partial update. On error the stored settings are unchanged.
    pub fn apply(&mut self, patch: &SettingsPatch) -> Result<Settings, CoreError> {
        let next = self.current.merged(patch)?;
        self.current = next;
        Ok(next)
    }
}
