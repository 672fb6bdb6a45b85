// Shared transport configuration for building reqwest::Client instances.
//
// The hub speaks plain HTTP on the local network, so there is no TLS or
// cookie machinery here -- just the timeout and user agent every request
// shares. Kept as its own type so the REST client and any future callers
// build identical clients.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout. Applies to every REST call; timeouts surface
    /// as transport errors like any other network failure.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("homelink/0.1.0")
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
