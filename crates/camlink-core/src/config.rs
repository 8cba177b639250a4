// ── Runtime session configuration ──
//
// Describes *how* the session talks to a camera: timeouts, discovery
// candidates, initial settings. Built by the CLI (via camlink-config) and
// handed in; core never reads config files.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use camlink_api::{DeviceAddress, StreamTemplate, TransportConfig};

use crate::settings::Settings;

pub const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SCAN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Previously-seen addresses kept for discovery.
pub const MAX_KNOWN_ADDRESSES: usize = 8;

/// Address the camera serves its own access point on out of the box.
pub fn factory_address() -> DeviceAddress {
    DeviceAddress::from_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 42, 1)))
}

/// Gateway-style addresses a camera joined to an existing network or
/// phone hotspot commonly ends up behind.
pub fn subnet_defaults() -> Vec<DeviceAddress> {
    [
        Ipv4Addr::new(192, 168, 1, 1),
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(10, 5, 5, 9),
        Ipv4Addr::new(192, 168, 43, 1),
    ]
    .into_iter()
    .map(|ip| DeviceAddress::from_ip(IpAddr::V4(ip)))
    .collect()
}

/// Configuration for a single device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound for `GET /camera-info` during connect and refresh.
    pub info_timeout: Duration,
    /// Bound for preview and record commands.
    pub command_timeout: Duration,
    /// Bound for each candidate probed during a scan.
    pub scan_attempt_timeout: Duration,
    /// First scan candidate.
    pub factory_address: DeviceAddress,
    /// Last scan candidates, after previously-seen addresses.
    pub subnet_defaults: Vec<DeviceAddress>,
    /// Previously-seen addresses, most recent first.
    pub known_addresses: Vec<DeviceAddress>,
    /// Settings in effect when the session starts.
    pub settings: Settings,
    pub stream_template: StreamTemplate,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            info_timeout: DEFAULT_INFO_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            scan_attempt_timeout: DEFAULT_SCAN_ATTEMPT_TIMEOUT,
            factory_address: factory_address(),
            subnet_defaults: subnet_defaults(),
            known_addresses: Vec::new(),
            settings: Settings::default(),
            stream_template: StreamTemplate::default(),
            transport: TransportConfig::default(),
        }
    }
}
