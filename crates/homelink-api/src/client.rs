// Hub REST client
//
// Wraps `reqwest::Client` with hub-specific URL construction and response
// handling. The hub acknowledges rejected commands with HTTP 200 and an
// error-status body, so command acks are parsed rather than trusted from
// the status code alone.

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Acknowledgement body for `POST /api/devices/{id}/command`.
///
/// The hub always answers HTTP 200; `status` distinguishes success from
/// rejection (e.g. an unknown device id).
#[derive(Debug, Clone, Deserialize)]
pub struct CommandAck {
    pub status: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Per-device entry in the energy report.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEnergyDto {
    pub power_usage: f64,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Raw energy report as returned by `GET /api/analytics/energy`.
///
/// `recommendations` may be absent or empty; normalization (the placeholder
/// entry) is a core-layer concern, not a wire concern.
#[derive(Debug, Clone, Deserialize)]
pub struct EnergyReportDto {
    #[serde(default)]
    pub total_consumption: Option<f64>,
    #[serde(default)]
    pub per_device: HashMap<String, DeviceEnergyDto>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
}

/// Raw HTTP client for the Homelink hub's REST API.
///
/// Holds the base URL and a configured `reqwest::Client`. All methods
/// return decoded payloads; HTTP and body-level failures are normalized
/// into [`Error`] before the caller sees them.
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HubClient {
    /// Create a new hub client from a `TransportConfig`.
    ///
    /// `base_url` is the hub root, e.g. `http://192.168.1.50:8080`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a hub client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The hub base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL for an API path, e.g. `api_url("devices")`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the full device snapshot mapping (initial load).
    ///
    /// `GET /api/devices` -- device id → partial field map. Field sets are
    /// device-type-specific, so values stay as open JSON maps here.
    pub async fn get_devices(
        &self,
    ) -> Result<HashMap<String, serde_json::Map<String, serde_json::Value>>, Error> {
        let url = self.api_url("devices")?;
        debug!("fetching device snapshot");
        self.get_json(url).await
    }

    /// Send a command to a single device.
    ///
    /// `POST /api/devices/{id}/command` with `{"action": ..., ...params}`.
    /// A `{"status": "error"}` ack is surfaced as [`Error::CommandRejected`]
    /// even though the hub answers HTTP 200.
    pub async fn send_command(
        &self,
        device_id: &str,
        action: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<CommandAck, Error> {
        let url = self.api_url(&format!("devices/{device_id}/command"))?;
        debug!(device_id, action, "sending device command");

        let mut body = json!({ "action": action });
        if let Some(obj) = body.as_object_mut() {
            for (k, v) in params {
                obj.insert(k.clone(), v.clone());
            }
        }

        let resp = self.http.post(url).json(&body).send().await?;
        let ack: CommandAck = Self::decode(resp).await?;

        if ack.status != "success" {
            return Err(Error::CommandRejected {
                message: ack
                    .message
                    .unwrap_or_else(|| format!("status={}", ack.status)),
            });
        }
        Ok(ack)
    }

    /// Fetch the on-demand energy analytics report.
    ///
    /// `GET /api/analytics/energy`
    pub async fn get_energy_report(&self) -> Result<EnergyReportDto, Error> {
        let url = self.api_url("analytics/energy")?;
        debug!("fetching energy report");
        self.get_json(url).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON response.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::decode(resp).await
    }

    /// Check the HTTP status and decode the body, keeping a body preview
    /// in the error when decoding fails.
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: preview(&body).to_owned(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

const PREVIEW_CHARS: usize = 200;

/// Truncate a response body for error messages.
///
/// Counts characters, not bytes: a hub or proxy error page may carry
/// multibyte text anywhere, and a byte-offset slice would panic on a
/// char boundary.
fn preview(body: &str) -> &str {
    match body.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_body_is_unchanged() {
        assert_eq!(preview("boom"), "boom");
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let body = format!("{}日本語", "a".repeat(198));
        let p = preview(&body);
        assert_eq!(p.chars().count(), PREVIEW_CHARS);
        assert!(p.ends_with('本'));
    }
}
