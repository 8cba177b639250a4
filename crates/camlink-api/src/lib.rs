// camlink-api: Async Rust client for a network camera's HTTP control surface.
//
// Stateless: every call names the device address and a timeout.
// Retry policy and session state live in `camlink-core`.

pub mod address;
pub mod client;
pub mod error;
pub mod models;
pub mod stream;
pub mod transport;

pub use address::DeviceAddress;
pub use client::{DeviceClient, Route};
pub use error::{Error, FailureKind};
pub use models::{Ack, DeviceInfo, PreviewRequest, RecordRequest};
pub use stream::{StreamLocator, StreamTemplate};
pub use transport::TransportConfig;
