//! Async client for the Homelink hub's HTTP and push interfaces.
//!
//! This crate covers the wire layer only:
//!
//! - **[`HubClient`]** — REST calls against the hub: full device snapshot
//!   (`GET /api/devices`), device commands
//!   (`POST /api/devices/{id}/command`), and the on-demand energy report
//!   (`GET /api/analytics/energy`).
//! - **[`PushHandle`](push::PushHandle)** — the server→client push channel.
//!   Forwards every inbound text frame verbatim and exposes connectivity as
//!   a [`watch`](tokio::sync::watch) signal. Reconnects with bounded
//!   exponential backoff.
//! - **[`Error`]** — transport-level failure taxonomy. `homelink-core` maps
//!   these into its own user-facing variants; consumers of this crate never
//!   need to inspect raw `reqwest` errors.
//!
//! Payload interpretation (merging, workflows, analytics normalization)
//! lives in `homelink-core`.

pub mod client;
pub mod error;
pub mod push;
pub mod transport;

pub use client::{CommandAck, DeviceEnergyDto, EnergyReportDto, HubClient};
pub use error::Error;
pub use push::{ConnectivityState, PushHandle, ReconnectConfig};
pub use transport::TransportConfig;
