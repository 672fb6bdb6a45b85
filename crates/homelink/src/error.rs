//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use homelink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const COMMAND_FAILED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const BUSY: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to hub at {url}")]
    #[diagnostic(
        code(homelink::connection_failed),
        help(
            "Check that the hub is running and accessible.\n\
             URL: {url}\n\
             Override with --hub or HOMELINK_HUB."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Commands / workflows ─────────────────────────────────────────
    #[error("Workflow failed at step {step}: {reason}")]
    #[diagnostic(
        code(homelink::workflow_failed),
        help("Steps before the failing one were already applied; later steps were skipped.")
    )]
    WorkflowFailed { step: usize, reason: String },

    #[error("A workflow for '{trigger}' is already running")]
    #[diagnostic(
        code(homelink::busy),
        help("Wait for the running workflow (and its cool-down) to finish, then retry.")
    )]
    Busy { trigger: String },

    #[error("Timed out after {seconds}s waiting for the workflow to finish")]
    #[diagnostic(
        code(homelink::timeout),
        help("Increase the wait with --wait or check hub responsiveness.")
    )]
    WorkflowTimeout { seconds: u64 },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{id}' not found")]
    #[diagnostic(
        code(homelink::not_found),
        help("Run: homelink devices to list known devices")
    )]
    DeviceNotFound { id: String },

    // ── Analytics ────────────────────────────────────────────────────
    #[error("Energy report fetch failed: {message}")]
    #[diagnostic(code(homelink::fetch_failed))]
    FetchFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(homelink::validation))]
    Validation { field: String, reason: String },

    // ── API / misc ───────────────────────────────────────────────────
    #[error("Hub API error: {message}")]
    #[diagnostic(code(homelink::api_error))]
    Api { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(homelink::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::WorkflowFailed { .. } => exit_code::COMMAND_FAILED,
            Self::Busy { .. } => exit_code::BUSY,
            Self::WorkflowTimeout { .. } => exit_code::TIMEOUT,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Disconnected => Self::ConnectionFailed {
                url: String::new(),
                reason: "hub disconnected".into(),
            },
            CoreError::CommandFailed { action, message } => Self::WorkflowFailed {
                step: 0,
                reason: format!("{action}: {message}"),
            },
            CoreError::WorkflowBusy { trigger } => Self::Busy { trigger },
            CoreError::FetchFailed { message } => Self::FetchFailed { message },
            CoreError::MalformedPayload { reason } => Self::Api {
                message: format!("malformed hub payload: {reason}"),
            },
            CoreError::Api { message, status } => Self::Api {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },
            CoreError::Config { message } => Self::Validation {
                field: "hub".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Api { message },
        }
    }
}
