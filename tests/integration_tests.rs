// Integration tests: HTTP and WebSocket endpoints over a live poller

mod common;

use axum_test::TestServer;
use common::{ScriptedSource, filter, runs};
use runprogress::config::AppConfig;
use runprogress::models::{PollerState, ProgressView, RunStatus};
use runprogress::poller::{PollerConfig, PollerHandle, spawn};
use runprogress::routes;
use std::sync::Arc;
use tokio::time::Duration;

const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[source]
endpoint = "http://localhost:3000/graphql"
pipeline_name = "backfill_job"
tags = ["dagster/backfill=bf-1"]

[polling]
interval_ms = 60000
view_tick_ms = 50

[publishing]
ws_ping_interval_secs = 30
ws_send_timeout_secs = 5
"#;

fn test_app_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

fn test_app(source: Arc<ScriptedSource>) -> (axum::Router, PollerHandle) {
    let config = test_app_config();
    let handle = spawn(
        source,
        PollerConfig {
            filter: filter(),
            ..config.poller_config()
        },
    );
    let app = routes::app(handle.client(), config);
    (app, handle)
}

async fn wait_until(handle: &PollerHandle, pred: impl FnMut(&ProgressView) -> bool) {
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(3), rx.wait_for(pred))
        .await
        .expect("timed out waiting for poller")
        .expect("poller gone");
}

#[tokio::test]
async fn test_root_endpoint() {
    let (app, _handle) = test_app(Arc::new(ScriptedSource::new(vec![])));
    let server = TestServer::new(app).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("runprogress: watching run status");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (app, _handle) = test_app(Arc::new(ScriptedSource::new(vec![])));
    let server = TestServer::new(app).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("runprogress")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_progress_endpoint_returns_summary() {
    use RunStatus::*;
    let source = Arc::new(ScriptedSource::new(runs(&[
        Queued, Queued, Success, Success, Failure,
    ])));
    let (app, handle) = test_app(source);
    wait_until(&handle, |v| v.summary.is_some()).await;

    let server = TestServer::new(app).unwrap();
    let response = server.get("/api/progress").await;
    response.assert_status_ok();
    let view: ProgressView = response.json();
    assert_eq!(view.state, PollerState::Polling);
    assert_eq!(view.finished, 3);
    assert_eq!(view.summary.map(|s| s.total), Some(5));
    assert_eq!(view.headline.as_deref(), Some("3/5 runs done (60.0%)"));
    assert_eq!(view.breakdown.len(), 3);
    assert!(view.remaining_millis.is_some());
}

#[tokio::test]
async fn test_refresh_endpoint_triggers_fetch() {
    let source = Arc::new(ScriptedSource::new(runs(&[RunStatus::Started])));
    let (app, handle) = test_app(source.clone());
    wait_until(&handle, |v| v.fetch_count == 1 && !v.refreshing).await;

    let server = TestServer::new(app).unwrap();
    let response = server.post("/api/refresh").await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);

    wait_until(&handle, |v| v.fetch_count == 2 && !v.refreshing).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_refresh_endpoint_after_shutdown_is_unavailable() {
    let (app, handle) = test_app(Arc::new(ScriptedSource::new(vec![])));
    handle.shutdown().await;

    let server = TestServer::new(app).unwrap();
    let response = server.post("/api/refresh").await;
    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

// --- WebSocket tests (require http_transport + ws feature) ---
// Receive until a JSON view matches (server may send Ping first).

async fn receive_view_matching(
    ws: &mut axum_test::TestWebSocket,
    mut pred: impl FnMut(&ProgressView) -> bool,
) -> ProgressView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(view) = serde_json::from_str::<ProgressView>(&text)
            && pred(&view)
        {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for matching view"
        );
    }
}

#[tokio::test]
async fn test_ws_progress_streams_until_stopped() {
    use RunStatus::*;
    let source = Arc::new(
        ScriptedSource::new(runs(&[Success, Success, Failure])).with_script(vec![Ok(runs(&[
            Queued, Started, Failure,
        ]))]),
    );
    let (app, handle) = test_app(source.clone());
    let server = TestServer::builder().http_transport().build(app).unwrap();
    let mut ws = server
        .get_websocket("/ws/progress")
        .await
        .into_websocket()
        .await;

    let first = receive_view_matching(&mut ws, |v| v.summary.is_some()).await;
    assert_eq!(first.finished, 1);
    assert_eq!(first.state, PollerState::Polling);

    handle.refresh_now();
    let done = receive_view_matching(&mut ws, |v| v.state == PollerState::Stopped).await;
    assert_eq!(done.finished, 3);
    assert_eq!(done.remaining_millis, None);
    assert!((done.percent_complete - 1.0).abs() < f64::EPSILON);
}
