#![allow(clippy::unwrap_used)]
// Integration tests for the `Session` state machine against a wiremock camera.

use std::net::TcpListener;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use camlink_core::{
    ConnectionState, CoreError, DeviceAddress, FailureKind, Intent, OperationalStatus, Session,
    SessionConfig, SettingsPatch,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn test_config() -> SessionConfig {
    SessionConfig {
        info_timeout: Duration::from_secs(2),
        command_timeout: Duration::from_millis(300),
        scan_attempt_timeout: Duration::from_millis(300),
        ..SessionConfig::default()
    }
}

async fn setup() -> (MockServer, Session, DeviceAddress) {
    let server = MockServer::start().await;
    let addr = DeviceAddress::parse(&server.uri()).unwrap();
    (server, Session::new(test_config()).unwrap(), addr)
}

fn closed_address() -> DeviceAddress {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    DeviceAddress::parse(&format!("127.0.0.1:{port}")).unwrap()
}

async fn mount_info(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "Yi4K",
            "firmware": "1.10.9",
            "battery": 70
        })))
        .mount(server)
        .await;
}

async fn mount_ok(server: &MockServer, route: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Poll until the mock server has seen a request on `route`.
async fn wait_for_request(server: &MockServer, route: &str) {
    for _ in 0..200 {
        let seen = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|r| r.url.path() == route);
        if seen {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no request on {route}");
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_connect_record_stop_round() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .and(body_json(json!({
            "resolution": "1920x1080",
            "quality": "high",
            "mode": "video"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    mount_ok(&server, "/stop-record").await;

    let snap = session.connect(addr.clone()).await.unwrap();
    assert_eq!(snap.state, ConnectionState::Connected);
    let camera = snap.camera.as_ref().unwrap();
    assert_eq!(camera.model, "Yi4K");
    assert_eq!(camera.battery_percent, 70);
    assert_eq!(camera.status, OperationalStatus::Connected);
    assert_eq!(camera.address, addr);

    let snap = session.start_recording().await.unwrap();
    assert_eq!(snap.state, ConnectionState::Recording { uncertain: false });
    assert_eq!(snap.camera.as_ref().unwrap().status, OperationalStatus::Recording);

    let snap = session.stop_recording().await.unwrap();
    assert_eq!(snap.state, ConnectionState::Connected);
    assert_eq!(snap.camera.as_ref().unwrap().status, OperationalStatus::Connected);
    assert!(snap.last_error.is_none());
}

#[tokio::test]
async fn test_connect_failure_returns_to_disconnected() {
    let session = Session::new(test_config()).unwrap();

    let err = session.connect(closed_address()).await.unwrap_err();
    assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    assert_eq!(err.failure_kind(), Some(FailureKind::Unreachable));

    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert!(snap.camera.is_none());
    assert!(snap.last_error.is_some());
}

#[tokio::test]
async fn test_connect_rejects_when_already_connected() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    session.connect(addr.clone()).await.unwrap();

    let err = session.connect(addr).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::IllegalTransition {
            intent: Intent::Connect,
            state: ConnectionState::Connected
        }
    ));
}

#[tokio::test]
async fn test_start_recording_while_disconnected_is_illegal() {
    let session = Session::new(test_config()).unwrap();
    let before = session.snapshot();

    let err = session.start_recording().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::IllegalTransition {
            intent: Intent::StartRecording,
            state: ConnectionState::Disconnected
        }
    ));
    assert!(err.is_usage_error());

    let after = session.snapshot();
    assert_eq!(after.revision, before.revision);
    assert_eq!(after.state, ConnectionState::Disconnected);
    assert!(after.last_error.is_none());
}

#[tokio::test]
async fn test_disconnect_clears_camera_and_preview() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/start-preview").await;

    session.connect(addr).await.unwrap();
    let snap = session.start_preview().await.unwrap();
    assert!(snap.preview.is_some());

    let snap = session.disconnect().await;
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert!(snap.camera.is_none());
    assert!(snap.preview.is_none());
}

#[tokio::test]
async fn test_disconnect_while_recording_drops_camera() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/start-record").await;

    session.connect(addr).await.unwrap();
    session.start_recording().await.unwrap();

    let snap = session.disconnect().await;
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert!(snap.camera.is_none());
    assert!(snap.preview.is_none());
}

#[tokio::test]
async fn test_disconnect_after_unconfirmed_stop_drops_camera() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/start-record").await;
    Mock::given(method("POST"))
        .and(path("/stop-record"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    session.start_recording().await.unwrap();
    let err = session.stop_recording().await.unwrap_err();
    assert!(matches!(err, CoreError::StopRecordingFailed { .. }));
    assert_eq!(
        session.snapshot().state,
        ConnectionState::Recording { uncertain: true }
    );

    let snap = session.disconnect().await;
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert!(snap.camera.is_none());
}

#[tokio::test]
async fn test_connect_remembers_address() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;

    let snap = session.connect(addr.clone()).await.unwrap();
    assert_eq!(snap.known_addresses.first(), Some(&addr));

    let candidates = session.default_candidates().await;
    assert_eq!(candidates[0], session.config().factory_address);
    assert_eq!(candidates[1], addr);
}

#[tokio::test]
async fn test_reconnect_walks_through_connecting() {
    let (server, session, addr) = setup().await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "model": "Yi4K" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // The re-probe lingers so the intermediate state is observable.
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "model": "Yi4K" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    session.connect(addr).await.unwrap();

    let mut sub = session.subscribe();
    let task = tokio::spawn({
        let session = session.clone();
        async move { session.reconnect().await }
    });

    let connecting = sub
        .wait_for(|s| s.state == ConnectionState::Connecting)
        .await
        .unwrap();
    assert!(connecting.camera.is_none());

    let snap = task.await.unwrap().unwrap();
    assert_eq!(snap.state, ConnectionState::Connected);
    assert!(snap.camera.is_some());
}

// ── Recording ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_recording_timeout_stays_connected() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    let err = session.start_recording().await.unwrap_err();
    assert!(matches!(err, CoreError::RecordingFailed { .. }));
    assert_eq!(err.failure_kind(), Some(FailureKind::Timeout));
    assert!(!err.is_retryable());

    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Connected);
    assert!(snap.last_error.is_some());
}

#[tokio::test]
async fn test_start_recording_rejected_stays_connected() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .respond_with(ResponseTemplate::new(409).set_body_string("sd card full"))
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    let err = session.start_recording().await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::Rejected));
    assert_eq!(session.snapshot().state, ConnectionState::Connected);
}

#[tokio::test]
async fn test_stop_timeout_leaves_recording_uncertain() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/start-record").await;
    Mock::given(method("POST"))
        .and(path("/stop-record"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_ok(&server, "/stop-record").await;

    session.connect(addr).await.unwrap();
    session.start_recording().await.unwrap();

    let err = session.stop_recording().await.unwrap_err();
    assert!(matches!(err, CoreError::StopRecordingFailed { .. }));
    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Recording { uncertain: true });
    assert!(snap.is_recording());
    assert_eq!(snap.camera.as_ref().unwrap().status, OperationalStatus::Recording);

    // A second stop is accepted from the uncertain state.
    let snap = session.stop_recording().await.unwrap();
    assert_eq!(snap.state, ConnectionState::Connected);
}

#[tokio::test]
async fn test_start_recording_while_recording_is_illegal() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/start-record").await;

    session.connect(addr).await.unwrap();
    session.start_recording().await.unwrap();

    let err = session.start_recording().await.unwrap_err();
    assert!(matches!(err, CoreError::IllegalTransition { .. }));
    assert_eq!(
        session.snapshot().state,
        ConnectionState::Recording { uncertain: false }
    );
}

// ── Preview ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preview_exposes_stream_locator() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-preview"))
        .and(body_json(json!({ "resolution": "1920x1080" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session.connect(addr.clone()).await.unwrap();
    let snap = session.start_preview().await.unwrap();
    assert_eq!(
        snap.preview.as_ref().unwrap().as_str(),
        format!("rtsp://{}/live", addr.host())
    );

    let snap = session.stop_preview().await;
    assert!(snap.preview.is_none());
    let revision = snap.revision;
    assert_eq!(session.stop_preview().await.revision, revision);
}

#[tokio::test]
async fn test_preview_failure_keeps_connection() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-preview"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    let err = session.start_preview().await.unwrap_err();
    assert!(matches!(err, CoreError::PreviewUnavailable { .. }));

    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Connected);
    assert!(snap.camera.is_some());
    assert!(snap.preview.is_none());
}

#[tokio::test]
async fn test_preview_while_disconnected_is_illegal() {
    let session = Session::new(test_config()).unwrap();
    let err = session.start_preview().await.unwrap_err();
    assert!(matches!(err, CoreError::IllegalTransition { .. }));
}

// ── Settings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_setting_leaves_settings_unchanged() {
    let session = Session::new(test_config()).unwrap();
    let before = session.snapshot().settings;

    let patch = SettingsPatch::default()
        .with_quality("low")
        .with_resolution("9999x9999");
    let err = session.update_settings(&patch).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidSetting { ref field, .. } if field == "resolution"));
    assert_eq!(session.snapshot().settings, before);
}

#[tokio::test]
async fn test_settings_apply_to_next_recording() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .and(body_json(json!({
            "resolution": "3840x2160",
            "quality": "medium",
            "mode": "timelapse"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let patch = SettingsPatch::default()
        .with_resolution("3840x2160")
        .with_quality("medium")
        .with_mode("timelapse");
    session.update_settings(&patch).await.unwrap();

    session.connect(addr).await.unwrap();
    session.start_recording().await.unwrap();
}

#[tokio::test]
async fn test_settings_change_while_recording_waits_for_next_start() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/stop-record").await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .and(body_json(json!({
            "resolution": "1920x1080",
            "quality": "high",
            "mode": "video"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .and(body_json(json!({
            "resolution": "1280x720",
            "quality": "high",
            "mode": "video"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    session.start_recording().await.unwrap();

    let patch = SettingsPatch::default().with_resolution("1280x720");
    let snap = session.update_settings(&patch).await.unwrap();
    assert_eq!(snap.state, ConnectionState::Recording { uncertain: false });
    assert_eq!(snap.settings.resolution.to_string(), "1280x720");
    assert_eq!(
        snap.camera.as_ref().unwrap().status,
        OperationalStatus::Recording
    );

    session.stop_recording().await.unwrap();
    session.start_recording().await.unwrap();
}

#[tokio::test]
async fn test_queued_recording_keeps_settings_it_was_issued_under() {
    let server = MockServer::start().await;
    let addr = DeviceAddress::parse(&server.uri()).unwrap();
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-preview"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .and(body_json(json!({
            "resolution": "1920x1080",
            "quality": "high",
            "mode": "video"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(SessionConfig {
        command_timeout: Duration::from_secs(2),
        ..test_config()
    })
    .unwrap();
    session.connect(addr).await.unwrap();

    let preview = tokio::spawn({
        let session = session.clone();
        async move { session.start_preview().await }
    });
    wait_for_request(&server, "/start-preview").await;

    let record = tokio::spawn({
        let session = session.clone();
        async move { session.start_recording().await }
    });
    // Let the recording intent queue up behind the preview.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let patch = SettingsPatch::default().with_resolution("1280x720");
    let snap = session.update_settings(&patch).await.unwrap();
    assert_eq!(snap.settings.resolution.to_string(), "1280x720");
    assert_eq!(snap.state, ConnectionState::Recording { uncertain: false });

    assert!(preview.await.unwrap().is_ok());
    let recorded = record.await.unwrap().unwrap();
    assert_eq!(recorded.settings.resolution.to_string(), "1920x1080");
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_info_updates_battery() {
    let (server, session, addr) = setup().await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "battery": 80 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "battery": "65%" })))
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    let snap = session.refresh_info().await.unwrap();
    assert_eq!(snap.camera.as_ref().unwrap().battery_percent, 65);
    assert_eq!(snap.state, ConnectionState::Connected);
}

#[tokio::test]
async fn test_refresh_failure_keeps_state() {
    let (server, session, addr) = setup().await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "battery": 80 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    session.connect(addr).await.unwrap();
    let err = session.refresh_info().await.unwrap_err();
    assert!(matches!(err, CoreError::InfoRefreshFailed { .. }));

    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Connected);
    assert_eq!(snap.camera.as_ref().unwrap().battery_percent, 80);
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_disconnect_supersedes_pending_connect() {
    let (server, session, addr) = setup().await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "model": "Yi4K" }))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let mut sub = session.subscribe();
    let task = tokio::spawn({
        let session = session.clone();
        async move { session.connect(addr).await }
    });
    sub.wait_for(|s| s.state == ConnectionState::Connecting)
        .await
        .unwrap();

    session.disconnect().await;
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        CoreError::Superseded {
            intent: Intent::Connect
        }
    ));

    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert!(snap.camera.is_none());
}

#[tokio::test]
async fn test_disconnect_supersedes_pending_start_recording() {
    let server = MockServer::start().await;
    let addr = DeviceAddress::parse(&server.uri()).unwrap();
    mount_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/start-record"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    // Long enough that the command is still pending when we disconnect.
    let session = Session::new(SessionConfig {
        command_timeout: Duration::from_secs(5),
        ..test_config()
    })
    .unwrap();
    session.connect(addr).await.unwrap();

    let task = tokio::spawn({
        let session = session.clone();
        async move { session.start_recording().await }
    });
    wait_for_request(&server, "/start-record").await;

    session.disconnect().await;
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        CoreError::Superseded {
            intent: Intent::StartRecording
        }
    ));

    let snap = session.snapshot();
    assert_eq!(snap.state, ConnectionState::Disconnected);
    assert!(!snap.is_recording());
}

#[tokio::test]
async fn test_session_usable_after_superseded_connect() {
    let (server, session, addr) = setup().await;
    Mock::given(method("GET"))
        .and(path("/camera-info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "model": "Yi4K" }))
                .set_delay(Duration::from_millis(800)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_info(&server).await;

    let mut sub = session.subscribe();
    let task = tokio::spawn({
        let session = session.clone();
        let addr = addr.clone();
        async move { session.connect(addr).await }
    });
    sub.wait_for(|s| s.state == ConnectionState::Connecting)
        .await
        .unwrap();
    session.disconnect().await;
    assert!(task.await.unwrap().is_err());

    let snap = session.connect(addr).await.unwrap();
    assert_eq!(snap.state, ConnectionState::Connected);
}

// ── Snapshots ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_every_published_snapshot_is_consistent() {
    let (server, session, addr) = setup().await;
    mount_info(&server).await;
    mount_ok(&server, "/start-preview").await;
    mount_ok(&server, "/start-record").await;
    mount_ok(&server, "/stop-record").await;

    let mut sub = session.subscribe();
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(snap) = sub.changed().await {
            seen.push(snap);
        }
        seen
    });

    let mut returned = vec![session.connect(addr).await.unwrap()];
    returned.push(session.start_preview().await.unwrap());
    returned.push(session.start_recording().await.unwrap());
    returned.push(session.stop_recording().await.unwrap());
    returned.push(session.stop_preview().await);
    returned.push(session.disconnect().await);
    let _ = session.start_recording().await;

    for snap in &returned {
        assert!(snap.invariants_hold(), "{snap:?}");
    }
    let revisions: Vec<u64> = returned.iter().map(|s| s.revision).collect();
    assert!(revisions.windows(2).all(|w| w[0] < w[1]));

    drop(session);
    let seen = collector.await.unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|s| s.invariants_hold()));
    assert!(seen.windows(2).all(|w| w[0].revision < w[1].revision));
}

#[tokio::test]
async fn test_snapshot_stream_yields_current_then_changes() {
    use futures_util::StreamExt;

    let (server, session, addr) = setup().await;
    mount_info(&server).await;

    let mut stream = session.subscribe().into_stream();
    let first = stream.next().await.unwrap();
    assert_eq!(first.state, ConnectionState::Disconnected);

    session.connect(addr).await.unwrap();
    // A slow reader may skip Connecting; the stream ends on Connected.
    let mut last = first;
    while last.state != ConnectionState::Connected {
        last = stream.next().await.unwrap();
    }
    assert!(last.revision > 0);
    assert!(last.camera.is_some());
}
