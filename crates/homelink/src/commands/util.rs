//! Shared helpers for command handlers.

use std::time::Duration;

use homelink_api::{HubClient, TransportConfig};
use homelink_core::{CoreError, HubConfig};
use url::Url;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build a `HubConfig` from global flags.
pub fn hub_config(global: &GlobalOpts) -> Result<HubConfig, CliError> {
    let url: Url = global.hub.parse().map_err(|_| CliError::Validation {
        field: "hub".into(),
        reason: format!("invalid URL: {}", global.hub),
    })?;

    Ok(HubConfig {
        url,
        timeout: Duration::from_secs(global.timeout),
        ..HubConfig::default()
    })
}

/// Build a bare REST client for commands that don't need a live session.
pub fn hub_client(global: &GlobalOpts) -> Result<HubClient, CliError> {
    let config = hub_config(global)?;
    let transport = TransportConfig {
        timeout: config.timeout,
    };
    HubClient::new(config.url, &transport)
        .map_err(CoreError::from)
        .map_err(CliError::from)
}
