// Device HTTP client
//
// Wraps `reqwest::Client` with route construction, per-call timeouts and
// failure classification for the four control routes. No retries happen
// here: whether a retry is safe depends on the intent, which only the
// session knows.

use std::fmt;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::address::DeviceAddress;
use crate::error::Error;
use crate::models::{Ack, DeviceInfo, PreviewRequest, RecordRequest};
use crate::transport::TransportConfig;

/// Bodies longer than this are truncated when carried inside an error.
const ERROR_BODY_LIMIT: usize = 512;

/// Control routes exposed by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    CameraInfo,
    StartPreview,
    StartRecord,
    StopRecord,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::CameraInfo => "/camera-info",
            Self::StartPreview => "/start-preview",
            Self::StartRecord => "/start-record",
            Self::StopRecord => "/stop-record",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::CameraInfo => Method::GET,
            Self::StartPreview | Self::StartRecord | Self::StopRecord => Method::POST,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

/// Stateless HTTP client for a camera's control surface.
///
/// Holds no per-device state, so one instance can probe any number of
/// addresses (the scanner relies on this). Cloning is cheap: the inner
/// `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
}

impl DeviceClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    // ── Primitive requests ───────────────────────────────────────────

    /// `GET /camera-info`.
    ///
    /// A 200 with a JSON object always yields a `DeviceInfo`, filling any
    /// missing fields with defaults. Anything that is not a JSON object is
    /// `Malformed`; any other status is `Rejected`.
    pub async fn fetch_info(
        &self,
        addr: &DeviceAddress,
        timeout: Duration,
    ) -> Result<DeviceInfo, Error> {
        let route = Route::CameraInfo;
        let (status, body) = self.send::<()>(addr, route, None, timeout).await?;
        ensure_ok(route, status, &body)?;

        let value: Value = serde_json::from_str(&body).map_err(|e| Error::Malformed {
            route: route.to_string(),
            message: e.to_string(),
            body: truncate(&body),
        })?;

        DeviceInfo::from_json(&value).ok_or_else(|| Error::Malformed {
            route: route.to_string(),
            message: "expected a JSON object".into(),
            body: truncate(&body),
        })
    }

    /// Issue a command route and wait for the device's acknowledgement.
    ///
    /// Only HTTP 200 counts as an acknowledgement. The body must be empty
    /// or valid JSON; anything else is `Malformed`, because an ack that
    /// cannot be read is not an ack.
    pub async fn command<T: Serialize + ?Sized>(
        &self,
        addr: &DeviceAddress,
        route: Route,
        payload: Option<&T>,
        timeout: Duration,
    ) -> Result<Ack, Error> {
        let (status, body) = self.send(addr, route, payload, timeout).await?;
        ensure_ok(route, status, &body)?;

        if body.trim().is_empty() {
            return Ok(Ack { body: None });
        }

        serde_json::from_str::<Value>(&body)
            .map(|value| Ack { body: Some(value) })
            .map_err(|e| Error::Malformed {
                route: route.to_string(),
                message: e.to_string(),
                body: truncate(&body),
            })
    }

    // ── Command helpers ──────────────────────────────────────────────

    /// `POST /start-preview` with `{resolution}`.
    pub async fn start_preview(
        &self,
        addr: &DeviceAddress,
        request: &PreviewRequest,
        timeout: Duration,
    ) -> Result<Ack, Error> {
        self.command(addr, Route::StartPreview, Some(request), timeout)
            .await
    }

    /// `POST /start-record` with `{resolution, quality, mode}`.
    pub async fn start_record(
        &self,
        addr: &DeviceAddress,
        request: &RecordRequest,
        timeout: Duration,
    ) -> Result<Ack, Error> {
        self.command(addr, Route::StartRecord, Some(request), timeout)
            .await
    }

    /// `POST /stop-record`, no body.
    pub async fn stop_record(&self, addr: &DeviceAddress, timeout: Duration) -> Result<Ack, Error> {
        self.command::<()>(addr, Route::StopRecord, None, timeout)
            .await
    }

    // ── Transport ────────────────────────────────────────────────────

    /// Send a request and read the full body within `timeout`.
    async fn send<T: Serialize + ?Sized>(
        &self,
        addr: &DeviceAddress,
        route: Route,
        payload: Option<&T>,
        timeout: Duration,
    ) -> Result<(StatusCode, String), Error> {
        let url = addr.endpoint(route.path())?;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        debug!(%addr, %route, timeout_ms, "device request");

        let mut request = self.http.request(route.method(), url).timeout(timeout);
        if let Some(body) = payload {
            request = request.json(body);
        }

        let route_label = route.to_string();
        let resp = request
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&e, &route_label, timeout_ms))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&e, &route_label, timeout_ms))?;

        trace!(%addr, %route, status = status.as_u16(), body_len = body.len(), "device response");
        Ok((status, body))
    }
}

fn ensure_ok(route: Route, status: StatusCode, body: &str) -> Result<(), Error> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(Error::Rejected {
            route: route.to_string(),
            status: status.as_u16(),
            body: truncate(body),
        })
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_labels() {
        assert_eq!(Route::CameraInfo.to_string(), "GET /camera-info");
        assert_eq!(Route::StopRecord.to_string(), "POST /stop-record");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 10);
        let out = truncate(&body);
        assert_eq!(out.chars().count(), ERROR_BODY_LIMIT + 1);
        assert!(out.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }
}
