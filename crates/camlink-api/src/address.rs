// Device addressing
//
// A camera is identified by the host its control surface listens on.
// Factory firmware serves plain HTTP on port 80, but test rigs and
// port-forwarded setups need an explicit port, so both are accepted.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Host identifier (IP or hostname, optional port) of one camera.
///
/// Immutable once built; parsing normalises `http://host:port/` and
/// `host:port` to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress {
    host: String,
    port: Option<u16>,
}

impl DeviceAddress {
    /// Parse a host identifier: `192.168.42.1`, `cam.local:8080`, or
    /// `http://10.0.0.5:8080`.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        let invalid = |reason: &str| Error::InvalidAddress {
            input: input.to_owned(),
            reason: reason.to_owned(),
        };

        if trimmed.is_empty() {
            return Err(invalid("address is empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("address contains whitespace"));
        }

        let url = if trimmed.contains("://") {
            Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?
        } else {
            Url::parse(&format!("http://{trimmed}")).map_err(|e| invalid(&e.to_string()))?
        };

        if url.scheme() != "http" {
            return Err(invalid("only http:// control surfaces are supported"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("credentials are not part of a device address"));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("address must not carry a path or query"));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?
            .to_owned();

        Ok(Self {
            host,
            port: url.port(),
        })
    }

    /// Address for a bare IP on the default port.
    pub fn from_ip(ip: IpAddr) -> Self {
        let host = match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        Self { host, port: None }
    }

    /// Same host, explicit port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Root URL of the control surface: `http://{host}[:{port}]/`.
    pub fn base_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("http://{self}/"))?)
    }

    /// Full URL for a control route, e.g. `/camera-info`.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url()?.join(path.trim_start_matches('/'))?)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceAddress> for String {
    fn from(addr: DeviceAddress) -> Self {
        addr.to_string()
    }
}
