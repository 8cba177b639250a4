// ── Device session ──
//
// The state machine for one camera connection. Every intent is validated
// against the current state, network I/O runs outside the state lock, and
// the resulting transition is applied atomically once the device answers.
//
// Two locks, always taken in this order:
//   gate:  FIFO tokio mutex held for the whole of a network intent, so
//          device-bound intents run one at a time in arrival order.
//   state: short critical sections only; never held across I/O.
// Local intents (stop_preview, update_settings) also queue on the gate so
// they apply after every intent issued before them. Only disconnect skips
// it, which is what lets it cancel an in-flight connect or scan.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use camlink_api::{DeviceAddress, DeviceClient, DeviceInfo, PreviewRequest, RecordRequest, StreamLocator};

use crate::config::{MAX_KNOWN_ADDRESSES, SessionConfig};
use crate::error::CoreError;
use crate::model::{CameraInfo, ConnectionState, Intent, OperationalStatus, SessionSnapshot};
use crate::scanner::{Scanner, candidate_list};
use crate::settings::{SettingsPatch, SettingsStore};
use crate::stream::SnapshotStream;

// ── Session ──────────────────────────────────────────────────────

/// The main entry point for the presentation layer.
///
/// Cheaply cloneable via `Arc<SessionInner>`; clones drive the same
/// session. Every intent returns the snapshot it produced, and every
/// change is also published to subscribers.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    client: DeviceClient,
    gate: Mutex<()>,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<Arc<SessionSnapshot>>,
}

struct SessionState {
    connection: ConnectionState,
    camera: Option<CameraInfo>,
    settings: SettingsStore,
    preview: Option<StreamLocator>,
    last_error: Option<String>,
    known: Vec<DeviceAddress>,
    /// Bumped by every disconnect. An in-flight intent whose ticket epoch
    /// no longer matches has been overtaken and must drop its result.
    epoch: u64,
    cancel: CancellationToken,
    revision: u64,
}

/// Captured before an intent goes to the network.
struct Ticket {
    epoch: u64,
    cancel: CancellationToken,
}

impl Session {
    /// Create a session from configuration. Does NOT connect.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let client = DeviceClient::new(&config.transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a session around an existing `DeviceClient`.
    pub fn with_client(config: SessionConfig, client: DeviceClient) -> Self {
        let state = SessionState::new(&config);
        let (snapshots, _) = watch::channel(Arc::new(state.snapshot()));

        Self {
            inner: Arc::new(SessionInner {
                config,
                client,
                gate: Mutex::new(()),
                state: Mutex::new(state),
                snapshots,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Observation ──────────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.inner.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshots.subscribe())
    }

    /// Default scan order: factory address, previously-seen addresses,
    /// subnet defaults.
    pub async fn default_candidates(&self) -> Vec<DeviceAddress> {
        let state = self.inner.state.lock().await;
        self.candidates_for(&state)
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the camera at `address`. Legal only while disconnected.
    pub async fn connect(&self, address: DeviceAddress) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::Connect;
        let _gate = self.inner.gate.lock().await;

        let ticket = {
            let mut state = self.inner.state.lock().await;
            state.require(intent, |s| s == ConnectionState::Disconnected)?;
            state.transition(ConnectionState::Connecting);
            self.publish(&mut state);
            state.ticket()
        };

        debug!(%address, "connecting");
        let result = guarded(
            &ticket,
            self.inner
                .client
                .fetch_info(&address, self.inner.config.info_timeout),
        )
        .await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(info) => {
                state.establish(address, info);
                Ok(self.publish(&mut state))
            }
            Err(source) => {
                state.reset();
                Err(self.fail(
                    &mut state,
                    CoreError::ConnectionFailed {
                        address: address.to_string(),
                        source,
                    },
                ))
            }
        }
    }

    /// Discover a camera and connect to the first that answers.
    ///
    /// `None` uses [`default_candidates`](Self::default_candidates).
    /// The session shows `Connecting` for the duration of the scan and
    /// returns to `Disconnected` if nothing answers.
    pub async fn scan_and_connect(
        &self,
        candidates: Option<Vec<DeviceAddress>>,
    ) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::ScanAndConnect;
        let _gate = self.inner.gate.lock().await;

        let (ticket, candidates) = {
            let mut state = self.inner.state.lock().await;
            state.require(intent, |s| s == ConnectionState::Disconnected)?;
            let candidates = candidates.unwrap_or_else(|| self.candidates_for(&state));
            state.transition(ConnectionState::Connecting);
            self.publish(&mut state);
            (state.ticket(), candidates)
        };

        info!(candidates = candidates.len(), "scanning for camera");
        let scanner = Scanner::new(
            self.inner.client.clone(),
            self.inner.config.scan_attempt_timeout,
        );
        let result = guarded(&ticket, scanner.scan(&candidates)).await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(hit) => {
                state.establish(hit.address, hit.info);
                Ok(self.publish(&mut state))
            }
            Err(err) => {
                state.reset();
                Err(self.fail(&mut state, err))
            }
        }
    }

    /// Re-establish the connection to the current camera.
    ///
    /// Walks `Connected → Connecting → Connected`; a failed probe leaves
    /// the session `Disconnected`.
    pub async fn reconnect(&self) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::Reconnect;
        let _gate = self.inner.gate.lock().await;

        let (ticket, address) = {
            let mut state = self.inner.state.lock().await;
            state.require(intent, |s| s == ConnectionState::Connected)?;
            let address = state.address(intent)?;
            state.camera = None;
            state.preview = None;
            state.transition(ConnectionState::Connecting);
            self.publish(&mut state);
            (state.ticket(), address)
        };

        let result = guarded(
            &ticket,
            self.inner
                .client
                .fetch_info(&address, self.inner.config.info_timeout),
        )
        .await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(info) => {
                state.establish(address, info);
                Ok(self.publish(&mut state))
            }
            Err(source) => {
                state.reset();
                Err(self.fail(
                    &mut state,
                    CoreError::ConnectionFailed {
                        address: address.to_string(),
                        source,
                    },
                ))
            }
        }
    }

    /// Drop the session locally. Legal from any state and never waits on
    /// the device: an unreachable camera must not keep the controller from
    /// resetting itself. Any in-flight intent is cancelled and its result
    /// discarded.
    pub async fn disconnect(&self) -> Arc<SessionSnapshot> {
        let mut state = self.inner.state.lock().await;

        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.epoch += 1;

        if state.connection.is_recording() {
            warn!("disconnecting while recording; the camera keeps recording on its own");
        }
        state.reset();
        self.publish(&mut state)
    }

    // ── Device commands ──────────────────────────────────────────

    /// Ask the camera to start its preview feed and expose the stream
    /// locator. Legal while connected or recording.
    ///
    /// Failure leaves the connection untouched: preview is best-effort.
    pub async fn start_preview(&self) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::StartPreview;
        let _gate = self.inner.gate.lock().await;

        let (ticket, address, request) = {
            let state = self.inner.state.lock().await;
            state.require(intent, ConnectionState::is_established)?;
            let request = PreviewRequest::from(&state.settings.current());
            (state.ticket(), state.address(intent)?, request)
        };

        let result = guarded(
            &ticket,
            self.inner
                .client
                .start_preview(&address, &request, self.inner.config.command_timeout),
        )
        .await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(_) => {
                let locator = self.inner.config.stream_template.render(&address);
                info!(%locator, "preview started");
                state.preview = Some(locator);
                state.last_error = None;
                Ok(self.publish(&mut state))
            }
            Err(source) => Err(self.fail(&mut state, CoreError::PreviewUnavailable { source })),
        }
    }

    /// Release the stream locator. Local only and idempotent.
    pub async fn stop_preview(&self) -> Arc<SessionSnapshot> {
        let _gate = self.inner.gate.lock().await;
        let mut state = self.inner.state.lock().await;
        if state.preview.take().is_some() {
            debug!("preview released");
            self.publish(&mut state)
        } else {
            self.snapshot()
        }
    }

    /// Start recording with the current settings. Legal only while
    /// connected and not already recording.
    ///
    /// The session enters `Recording` only on an explicit acknowledgement;
    /// a timeout leaves it `Connected`.
    pub async fn start_recording(&self) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::StartRecording;
        let _gate = self.inner.gate.lock().await;

        let (ticket, address, request) = {
            let state = self.inner.state.lock().await;
            state.require(intent, |s| s == ConnectionState::Connected)?;
            let request = RecordRequest::from(&state.settings.current());
            (state.ticket(), state.address(intent)?, request)
        };

        info!(%address, resolution = %request.resolution, quality = %request.quality, mode = %request.mode, "starting recording");
        let result = guarded(
            &ticket,
            self.inner
                .client
                .start_record(&address, &request, self.inner.config.command_timeout),
        )
        .await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(_) => {
                state.enter(ConnectionState::Recording { uncertain: false });
                state.last_error = None;
                Ok(self.publish(&mut state))
            }
            Err(source) => Err(self.fail(&mut state, CoreError::RecordingFailed { source })),
        }
    }

    /// Stop recording. Legal while recording, including after an
    /// unconfirmed stop.
    ///
    /// Only an acknowledgement returns the session to `Connected`. Any
    /// failure leaves `Recording { uncertain: true }`: the camera may still
    /// be writing, and the caller must retry before trusting the state.
    pub async fn stop_recording(&self) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::StopRecording;
        let _gate = self.inner.gate.lock().await;

        let (ticket, address) = {
            let state = self.inner.state.lock().await;
            state.require(intent, ConnectionState::is_recording)?;
            (state.ticket(), state.address(intent)?)
        };

        let result = guarded(
            &ticket,
            self.inner
                .client
                .stop_record(&address, self.inner.config.command_timeout),
        )
        .await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(_) => {
                state.enter(ConnectionState::Connected);
                state.last_error = None;
                Ok(self.publish(&mut state))
            }
            Err(source) => {
                warn!(%address, error = %source, "stop-record not acknowledged; recording state uncertain");
                state.enter(ConnectionState::Recording { uncertain: true });
                Err(self.fail(&mut state, CoreError::StopRecordingFailed { source }))
            }
        }
    }

    /// Re-read camera metadata without changing the connection state.
    pub async fn refresh_info(&self) -> Result<Arc<SessionSnapshot>, CoreError> {
        let intent = Intent::RefreshInfo;
        let _gate = self.inner.gate.lock().await;

        let (ticket, address) = {
            let state = self.inner.state.lock().await;
            state.require(intent, ConnectionState::is_established)?;
            (state.ticket(), state.address(intent)?)
        };

        let result = guarded(
            &ticket,
            self.inner
                .client
                .fetch_info(&address, self.inner.config.info_timeout),
        )
        .await;

        let mut state = self.inner.state.lock().await;
        match settle(&state, &ticket, intent, result)? {
            Ok(info) => {
                let status = if state.connection.is_recording() {
                    OperationalStatus::Recording
                } else {
                    OperationalStatus::Connected
                };
                state.camera = Some(CameraInfo::from_device(address, info, status));
                state.last_error = None;
                Ok(self.publish(&mut state))
            }
            Err(source) => Err(self.fail(&mut state, CoreError::InfoRefreshFailed { source })),
        }
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Validate and apply a partial settings update. Legal in any state;
    /// never touches the network, but waits behind earlier intents so a
    /// queued recording starts with the settings it was issued under. An
    /// in-progress recording keeps the settings it started with.
    pub async fn update_settings(
        &self,
        patch: &SettingsPatch,
    ) -> Result<Arc<SessionSnapshot>, CoreError> {
        let _gate = self.inner.gate.lock().await;
        let mut state = self.inner.state.lock().await;
        let settings = state.settings.apply(patch)?;
        debug!(%settings, "settings updated");
        Ok(self.publish(&mut state))
    }

    // ── Internals ────────────────────────────────────────────────

    fn candidates_for(&self, state: &SessionState) -> Vec<DeviceAddress> {
        candidate_list(
            &self.inner.config.factory_address,
            &state.known,
            &self.inner.config.subnet_defaults,
        )
    }

    /// Record a failed intent and publish it.
    fn fail(&self, state: &mut SessionState, err: CoreError) -> CoreError {
        warn!(error = %err, state = %state.connection, "intent failed");
        state.last_error = Some(err.to_string());
        self.publish(state);
        err
    }

    fn publish(&self, state: &mut SessionState) -> Arc<SessionSnapshot> {
        state.revision += 1;
        let snap = Arc::new(state.snapshot());
        debug_assert!(snap.invariants_hold(), "session invariant violated: {snap:?}");
        debug!(revision = snap.revision, state = %snap.state, "snapshot published");
        self.inner.snapshots.send_replace(Arc::clone(&snap));
        snap
    }
}

impl SessionState {
    fn new(config: &SessionConfig) -> Self {
        let mut known = config.known_addresses.clone();
        known.truncate(MAX_KNOWN_ADDRESSES);

        Self {
            connection: ConnectionState::Disconnected,
            camera: None,
            settings: SettingsStore::new(config.settings),
            preview: None,
            last_error: None,
            known,
            epoch: 0,
            cancel: CancellationToken::new(),
            revision: 0,
        }
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            cancel: self.cancel.clone(),
        }
    }

    fn require(
        &self,
        intent: Intent,
        allowed: impl Fn(ConnectionState) -> bool,
    ) -> Result<(), CoreError> {
        if allowed(self.connection) {
            Ok(())
        } else {
            Err(CoreError::IllegalTransition {
                intent,
                state: self.connection,
            })
        }
    }

    fn address(&self, intent: Intent) -> Result<DeviceAddress, CoreError> {
        self.camera
            .as_ref()
            .map(|c| c.address.clone())
            .ok_or(CoreError::IllegalTransition {
                intent,
                state: self.connection,
            })
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.connection != next {
            info!(from = %self.connection, to = %next, "session transition");
            self.connection = next;
        }
    }

    /// Transition between connected and recording, keeping the camera's
    /// operational status in step.
    fn enter(&mut self, next: ConnectionState) {
        self.transition(next);
        if let Some(camera) = self.camera.as_mut() {
            camera.status = if next.is_recording() {
                OperationalStatus::Recording
            } else {
                OperationalStatus::Connected
            };
        }
    }

    fn establish(&mut self, address: DeviceAddress, info: DeviceInfo) {
        self.remember(address.clone());
        info!(%address, model = %info.model, firmware = %info.firmware, battery = info.battery_percent, "camera connected");
        self.camera = Some(CameraInfo::from_device(
            address,
            info,
            OperationalStatus::Connected,
        ));
        self.last_error = None;
        self.transition(ConnectionState::Connected);
    }

    fn reset(&mut self) {
        self.camera = None;
        self.preview = None;
        self.transition(ConnectionState::Disconnected);
    }

    fn remember(&mut self, address: DeviceAddress) {
        self.known.retain(|a| a != &address);
        self.known.insert(0, address);
        self.known.truncate(MAX_KNOWN_ADDRESSES);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            revision: self.revision,
            state: self.connection,
            camera: self.camera.clone(),
            settings: self.settings.current(),
            preview: self.preview.clone(),
            last_error: self.last_error.clone(),
            known_addresses: self.known.clone(),
            updated_at: Utc::now(),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Run `fut` unless the ticket is cancelled first.
async fn guarded<T>(ticket: &Ticket, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        () = ticket.cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

/// Accept an I/O result only if no disconnect overtook it.
fn settle<T>(
    state: &SessionState,
    ticket: &Ticket,
    intent: Intent,
    result: Option<T>,
) -> Result<T, CoreError> {
    match result {
        Some(out) if state.epoch == ticket.epoch => Ok(out),
        _ => {
            warn!(%intent, "result discarded: superseded by disconnect");
            Err(CoreError::Superseded { intent })
        }
    }
}
