//! Synchronization and dispatch engine between `homelink-api` and UI
//! consumers.
//!
//! This crate owns the business logic and reactive data infrastructure for
//! the Homelink workspace:
//!
//! - **[`Session`]** — Explicit session object managing the full lifecycle:
//!   [`connect()`](Session::connect) seeds the [`StateStore`] from the hub's
//!   REST snapshot, opens the push channel, and spawns the pump task that
//!   feeds the reconciler. Owns the motion-edge and malformed-payload
//!   counters and the session clock.
//!
//! - **[`StateStore`]** — Last-known snapshot per entity, merged
//!   field-by-field (last-write-per-field, never last-write-per-record).
//!   Built on `DashMap` + `tokio::sync::watch` snapshot channels.
//!
//! - **[`Reconciler`]** — Parses raw push frames, merges them atomically
//!   into the store, reports the changed entity set, and counts
//!   edge-triggered motion detections.
//!
//! - **[`Dispatcher`]** — Executes [`Workflow`]s (ordered command
//!   sequences) strictly in order, aborting on first failure, with a
//!   per-trigger re-entrancy guard and a terminal-status cool-down.
//!
//! - **[`AnalyticsRequester`]** — On-demand energy report fetch; a failed
//!   fetch never disturbs the previously displayed report, and an empty
//!   recommendation list is normalized to a single placeholder entry.

pub mod analytics;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod projection;
pub mod reconcile;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use analytics::{AnalyticsRequester, DeviceEnergy, EnergyReport, EnergyReportSource};
pub use config::HubConfig;
pub use dispatch::{Command, CommandTransport, Dispatcher, Workflow, WorkflowHandle, WorkflowStatus};
pub use error::CoreError;
pub use model::{EntityId, EntitySnapshot};
pub use projection::{BarSeries, energy_bar_series, format_uptime};
pub use reconcile::{MergeOutcome, Reconciler};
pub use session::Session;
pub use store::{StateStore, StoreSnapshot, StoreStream};

// Connectivity is defined at the transport layer but observed everywhere.
pub use homelink_api::ConnectivityState;
