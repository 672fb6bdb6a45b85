// ── Core error types ──
//
// User-facing errors from homelink-core. These are NOT transport-specific --
// consumers never see HTTP status codes or reqwest errors directly. The
// `From<homelink_api::Error>` impl translates wire-layer failures into
// domain-appropriate variants.
//
// None of these are fatal to the session: every variant is handled at the
// boundary where it occurs and converted into an observable signal (a
// frozen store, a failed workflow status, a preserved previous report).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to hub at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The push channel closed from the hub side.
    #[error("Hub disconnected")]
    Disconnected,

    // ── Push / merge errors ──────────────────────────────────────────
    /// A push frame failed to parse. The message is dropped, prior state
    /// is retained, and the session's malformed counter increments.
    #[error("Malformed push payload: {reason}")]
    MalformedPayload { reason: String },

    // ── Command errors ───────────────────────────────────────────────
    /// A workflow step's network call failed or the hub rejected it.
    #[error("Command '{action}' failed: {message}")]
    CommandFailed { action: String, message: String },

    /// A workflow with this trigger is already running; re-entrant
    /// dispatch is refused rather than queued.
    #[error("Workflow '{trigger}' is already running")]
    WorkflowBusy { trigger: String },

    // ── Analytics errors ─────────────────────────────────────────────
    /// The report fetch failed. Any previously fetched report is kept.
    #[error("Analytics fetch failed: {message}")]
    FetchFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Hub API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<homelink_api::Error> for CoreError {
    fn from(err: homelink_api::Error) -> Self {
        match err {
            homelink_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            homelink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            homelink_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            homelink_api::Error::CommandRejected { message } => CoreError::CommandFailed {
                action: "<unknown>".into(),
                message,
            },
            homelink_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            homelink_api::Error::PushConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push channel connection failed: {reason}"),
            },
            homelink_api::Error::PushClosed { .. } => CoreError::Disconnected,
        }
    }
}
