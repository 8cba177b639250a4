// Stream locators
//
// The live feed is served by the camera itself; this crate only builds the
// URL the external player should open. It is never probed here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;

/// Locator template used by stock firmware.
pub const DEFAULT_STREAM_TEMPLATE: &str = "rtsp://{host}/live";

/// URL template with `{host}`, `{port}` and `{address}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamTemplate(String);

impl StreamTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the address into the template.
    ///
    /// `{port}` expands to an empty string when the address has none, so
    /// templates should prefer `{address}` when a port may be present.
    pub fn render(&self, address: &DeviceAddress) -> StreamLocator {
        let port = address.port().map(|p| p.to_string()).unwrap_or_default();
        let url = self
            .0
            .replace("{address}", &address.to_string())
            .replace("{host}", address.host())
            .replace("{port}", &port);
        StreamLocator(url)
    }
}

impl Default for StreamTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_TEMPLATE)
    }
}

/// Opaque URL handed to the streaming collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamLocator(String);

impl StreamLocator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
