//! Push channel with auto-reconnect.
//!
//! Connects to the hub's WebSocket endpoint and forwards every inbound
//! text frame **verbatim** through a [`tokio::sync::broadcast`] channel.
//! This layer never interprets payload structure -- parsing and merging
//! belong to the reconciler in `homelink-core`.
//!
//! Connectivity is exposed as a [`watch`](tokio::sync::watch) signal so
//! downstream consumers observe `Connecting`/`Online`/`Offline` transitions
//! instead of assuming liveness. Reconnection uses exponential backoff
//! with a cap.
//!
//! # Example
//!
//! ```rust,ignore
//! use homelink_api::push::{PushHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://192.168.1.50:8080/ws")?;
//!
//! let handle = PushHandle::connect(ws_url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(raw) = rx.recv().await {
//!     println!("push frame: {raw}");
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Broadcast channel capacity ───────────────────────────────────────

const RAW_CHANNEL_CAPACITY: usize = 1024;

// ── ConnectivityState ────────────────────────────────────────────────

/// Observable connectivity of the push channel.
///
/// Transitions only inside the push loop: `Connecting` on each attempt,
/// `Online` once the socket opens, `Offline` on close or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityState {
    #[default]
    Connecting,
    Online,
    Offline,
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push-channel reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push-channel stream.
///
/// Call [`subscribe`](Self::subscribe) for the raw frame stream and
/// [`connectivity`](Self::connectivity) for the state signal. Call
/// [`shutdown`](Self::shutdown) to tear down the background task.
pub struct PushHandle {
    raw_rx: broadcast::Receiver<Arc<str>>,
    connectivity: watch::Receiver<ConnectivityState>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the push loop and return immediately.
    ///
    /// The first connection attempt happens asynchronously -- watch the
    /// connectivity receiver to observe it.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (raw_tx, raw_rx) = broadcast::channel(RAW_CHANNEL_CAPACITY);
        let (state_tx, connectivity) = watch::channel(ConnectivityState::Connecting);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(ws_url, raw_tx, state_tx, reconnect, task_cancel).await;
        });

        Self {
            raw_rx,
            connectivity,
            cancel,
        }
    }

    /// Get a new broadcast receiver for the raw frame stream.
    ///
    /// Frames arrive in delivery order. A consumer that falls behind
    /// receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.raw_rx.resubscribe()
    }

    /// Subscribe to connectivity transitions.
    pub fn connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.connectivity.clone()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn push_loop(
    ws_url: Url,
    raw_tx: broadcast::Sender<Arc<str>>,
    state_tx: watch::Sender<ConnectivityState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = state_tx.send(ConnectivityState::Connecting);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &raw_tx, &state_tx, &cancel) => {
                let _ = state_tx.send(ConnectivityState::Offline);

                match result {
                    // Clean disconnect (server close frame or stream ended).
                    // Reset the attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("push channel disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "push channel error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "push channel reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = backoff_delay(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    let _ = state_tx.send(ConnectivityState::Offline);
    tracing::debug!("push loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection, read frames until it drops.
///
/// Text frames are forwarded verbatim. Ping replies are handled by
/// tungstenite; Binary/Pong frames are ignored.
async fn connect_and_read(
    url: &Url,
    raw_tx: &broadcast::Sender<Arc<str>>,
    state_tx: &watch::Sender<ConnectivityState>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to push channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))?;

    tracing::info!("push channel connected");
    let _ = state_tx.send(ConnectivityState::Online);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        // No subscribers yet is fine -- drop silently.
                        let _ = raw_tx.send(Arc::from(text.as_str()));
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        tracing::trace!("push channel ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "push channel close frame received"
                            );
                        } else {
                            tracing::info!("push channel close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::PushConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("push channel stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-20% to spread out reconnection storms when several clients
/// lose the same hub at once. Seeded from the attempt number so tests stay
/// deterministic.
fn backoff_delay(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.2 * ((f64::from(attempt) * 3.7).cos());
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = backoff_delay(0, &config);
        let d1 = backoff_delay(1, &config);
        let d2 = backoff_delay(2, &config);

        // Each step should roughly double (within jitter bounds)
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = backoff_delay(10, &config);
        // With jitter factor up to 1.2, max effective is 12s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn connectivity_starts_as_connecting() {
        assert_eq!(ConnectivityState::default(), ConnectivityState::Connecting);
    }

    #[test]
    fn connectivity_display() {
        assert_eq!(ConnectivityState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectivityState::Online.to_string(), "online");
        assert_eq!(ConnectivityState::Offline.to_string(), "offline");
    }
}
