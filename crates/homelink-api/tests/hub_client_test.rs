#![allow(clippy::unwrap_used)]
// Integration tests for `HubClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use homelink_api::{Error, HubClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HubClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = HubClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Device snapshot tests ───────────────────────────────────────────

#[tokio::test]
async fn test_get_devices() {
    let (server, client) = setup().await;

    let body = json!({
        "switch-1": {
            "is_on": false,
            "brightness": 40,
            "power_consumption": 0.0,
            "mode": "normal"
        },
        "motion-1": {
            "motion_detected": false,
            "location": "hallway",
            "sensitivity": 0.7
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let devices = client.get_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices["switch-1"]["brightness"], 40);
    assert_eq!(devices["motion-1"]["location"], "hallway");
}

#[tokio::test]
async fn test_get_devices_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let result = client.get_devices().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_with_multibyte_body() {
    let (server, client) = setup().await;

    // An error page with a multibyte character straddling the preview
    // cutoff must come back as Error::Api, never a slice panic.
    let body = format!("{}é and more trailing text", "a".repeat(199));
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string(body))
        .mount(&server)
        .await;

    match client.get_devices().await {
        Err(Error::Api { status: 500, message }) => {
            assert_eq!(message.chars().count(), 200);
            assert!(message.ends_with('é'), "unexpected preview: {message}");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_with_multibyte_text() {
    let (server, client) = setup().await;

    let body = format!("{}über-kaputt", "x".repeat(197));
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let result = client.get_devices().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_devices_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client.get_devices().await;
    assert!(
        matches!(result, Err(Error::Api { status: 500, .. })),
        "expected Api error, got: {result:?}"
    );
}

// ── Command tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_send_command_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/devices/switch-1/command"))
        .and(body_partial_json(json!({
            "action": "set_brightness",
            "brightness": 80
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "device_id": "switch-1"
        })))
        .mount(&server)
        .await;

    let mut params = serde_json::Map::new();
    params.insert("brightness".into(), json!(80));

    let ack = client
        .send_command("switch-1", "set_brightness", &params)
        .await
        .unwrap();

    assert_eq!(ack.status, "success");
    assert_eq!(ack.device_id.as_deref(), Some("switch-1"));
}

#[tokio::test]
async fn test_send_command_rejected_with_http_200() {
    let (server, client) = setup().await;

    // The hub reports unknown devices with HTTP 200 and an error-status ack.
    Mock::given(method("POST"))
        .and(path("/api/devices/ghost-9/command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "Device ghost-9 not found"
        })))
        .mount(&server)
        .await;

    let result = client
        .send_command("ghost-9", "turn_on", &serde_json::Map::new())
        .await;

    match result {
        Err(Error::CommandRejected { message }) => {
            assert!(message.contains("ghost-9"), "unexpected message: {message}");
        }
        other => panic!("expected CommandRejected, got: {other:?}"),
    }
}

// ── Analytics tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_get_energy_report() {
    let (server, client) = setup().await;

    let body = json!({
        "total_consumption": 225.0,
        "per_device": {
            "switch-1": { "power_usage": 50.0, "duration": 3600 },
            "switch-2": { "power_usage": 100.0, "duration": 1800 }
        },
        "recommendations": [
            "Reduce usage of switch-2 which has high power consumption"
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/analytics/energy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let report = client.get_energy_report().await.unwrap();

    assert_eq!(report.total_consumption, Some(225.0));
    assert_eq!(report.per_device.len(), 2);
    assert_eq!(report.per_device["switch-2"].power_usage, 100.0);
    assert_eq!(report.recommendations.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_energy_report_without_recommendations() {
    let (server, client) = setup().await;

    // Recommendations absent entirely -- must decode, not error.
    let body = json!({
        "per_device": {
            "switch-1": { "power_usage": 12.5 }
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/analytics/energy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let report = client.get_energy_report().await.unwrap();

    assert!(report.total_consumption.is_none());
    assert!(report.recommendations.is_none());
    assert_eq!(report.per_device["switch-1"].duration, None);
}
