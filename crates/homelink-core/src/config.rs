// ── Runtime connection configuration ──
//
// Describes *how* to reach a hub. Built by the CLI (or any other consumer)
// and handed to `Session` -- core never reads config files.

use std::time::Duration;

use homelink_api::ReconnectConfig;
use url::Url;

use crate::error::CoreError;

/// Configuration for one hub session.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub base URL (e.g., `http://192.168.1.50:8080`).
    pub url: Url,
    /// Per-request timeout for REST calls.
    pub timeout: Duration,
    /// Push-channel reconnection policy.
    pub reconnect: ReconnectConfig,
    /// How long a workflow's terminal status stays visible before the
    /// trigger returns to its idle affordance.
    pub command_cooldown: Duration,
}

impl HubConfig {
    /// Derive the push-channel URL from the base URL (`/ws`, ws scheme).
    pub fn ws_url(&self) -> Result<Url, CoreError> {
        let mut ws = self.url.clone();
        let scheme = match self.url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        ws.set_scheme(scheme).map_err(|()| CoreError::Config {
            message: format!("cannot derive ws scheme from {}", self.url),
        })?;
        ws.set_path("/ws");
        Ok(ws)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8080").expect("static URL"),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
            command_cooldown: Duration::from_millis(2000),
        }
    }
}
