//! End-to-end session tests against a mock hub.
//!
//! The mock serves the REST endpoints only; the push channel cannot
//! connect and keeps retrying in the background, which is exactly the
//! degraded-but-alive behavior a real client shows against a hub with a
//! broken WebSocket endpoint.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use homelink_core::{EntityId, HubConfig, Session};

fn config_for(server: &MockServer) -> HubConfig {
    HubConfig {
        url: Url::parse(&server.uri()).expect("mock server uri"),
        timeout: Duration::from_secs(5),
        ..HubConfig::default()
    }
}

async fn mock_devices(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_seeds_store_from_rest_snapshot() {
    let server = MockServer::start().await;
    mock_devices(
        &server,
        json!({
            "switch-1": { "is_on": false, "brightness": 40, "location": "den" },
            "motion-1": { "motion_detected": true, "location": "hall" },
        }),
    )
    .await;

    let mut session = Session::new(config_for(&server)).expect("session");
    let mut changes = session.changes();
    session.connect().await.expect("connect");

    assert_eq!(session.store().len(), 2);
    let snap = session
        .store()
        .get(&EntityId::new("switch-1"))
        .expect("switch-1 seeded");
    assert_eq!(snap.flag("is_on"), Some(false));
    assert_eq!(snap.integer("brightness"), Some(40));

    // The seed flows through the same merge path as push frames: one
    // change notification, and the initial `true` counts as a motion edge.
    let outcome = changes.recv().await.expect("seed outcome");
    assert_eq!(outcome.changed.len(), 2);
    assert_eq!(session.motion_edges(), 1);

    session.disconnect().await;
}

#[tokio::test]
async fn connect_fails_when_hub_is_unreachable() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    drop(server);

    let mut session = Session::new(config).expect("session");
    assert!(session.connect().await.is_err());
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn commands_dispatch_through_the_session() {
    let server = MockServer::start().await;
    mock_devices(&server, json!({ "switch-1": { "is_on": false } })).await;
    Mock::given(method("POST"))
        .and(path("/api/devices/switch-1/command"))
        .and(body_partial_json(json!({ "action": "turn_on" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "device_id": "switch-1" })),
        )
        .mount(&server)
        .await;

    let mut session = Session::new(config_for(&server)).expect("session");
    session.connect().await.expect("connect");

    let workflow = homelink_core::Workflow::single(
        "test:switch-1",
        EntityId::new("switch-1"),
        homelink_core::Command::new("turn_on"),
    );
    let mut handle = session.dispatch(workflow).expect("dispatch");
    let status = handle.wait_terminal().await;
    assert_eq!(status, homelink_core::WorkflowStatus::Succeeded);

    session.disconnect().await;
}

#[tokio::test]
async fn failed_report_fetch_keeps_previous_report() {
    let server = MockServer::start().await;
    mock_devices(&server, json!({})).await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/energy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_consumption": 225.0,
            "per_device": {
                "switch-1": { "power_usage": 50.0, "duration": 3600 },
                "switch-2": { "power_usage": 100.0, "duration": 1800 },
            },
            "recommendations": [],
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/energy"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = Session::new(config_for(&server)).expect("session");

    let report = session.run_report().await.expect("first report");
    assert_eq!(report.total_consumption, 225.0);
    // Placeholder rule: empty recommendations render as one entry.
    assert_eq!(report.recommendations.len(), 1);

    let second = session.run_report().await;
    assert!(second.is_err());
    assert_eq!(session.analytics().latest().expect("retained"), report);
}
