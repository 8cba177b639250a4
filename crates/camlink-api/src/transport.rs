// Shared transport configuration for building reqwest::Client instances.
//
// Per-request timeouts are set by the caller on every call; this module
// only covers what is fixed for the lifetime of a client.

use std::time::Duration;

use crate::error::Error;

/// Default user agent sent to the device.
pub const USER_AGENT: &str = concat!("camlink/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for establishing the TCP connection. Request timeouts
    /// still apply on top of this.
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
    /// Keep idle connections to the device. Some firmware drops idle
    /// sockets without a FIN, so this defaults to off.
    pub keep_alive: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(2)),
            user_agent: USER_AGENT.into(),
            keep_alive: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// Proxies are disabled: the camera lives on the local network and a
    /// system-wide HTTP proxy would only get in the way.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if !self.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        builder
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}
