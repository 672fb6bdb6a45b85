// ── Energy analytics ──
//
// On-demand fetch of the hub's energy report. Reports are pulled over REST
// when asked for, never pushed, and never merged into the StateStore: a
// report is a self-contained value, replaced wholesale by the next
// successful fetch. A failed fetch keeps the previous report visible.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::EntityId;

/// Shown when the hub returns a report with no recommendations, so the
/// recommendations section is never empty.
pub const NO_RECOMMENDATIONS: &str = "No recommendations at this time.";

/// Per-device slice of an energy report.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEnergy {
    pub id: EntityId,
    /// Average draw in watts.
    pub power_usage: f64,
    /// Observation window in seconds.
    pub duration_secs: f64,
}

/// A normalized energy report.
///
/// Always well-formed regardless of what the hub omitted: the total falls
/// back to the per-device sum, devices are sorted by id, and the
/// recommendations list holds at least one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyReport {
    pub total_consumption: f64,
    pub per_device: Vec<DeviceEnergy>,
    pub recommendations: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl EnergyReport {
    fn from_dto(dto: homelink_api::EnergyReportDto) -> Self {
        let mut per_device: Vec<DeviceEnergy> = dto
            .per_device
            .into_iter()
            .map(|(id, d)| DeviceEnergy {
                id: EntityId::from(id),
                power_usage: d.power_usage,
                duration_secs: d.duration.unwrap_or(0.0),
            })
            .collect();
        per_device.sort_by(|a, b| a.id.cmp(&b.id));

        let total_consumption = dto
            .total_consumption
            .unwrap_or_else(|| per_device.iter().map(|d| d.power_usage).sum());

        let mut recommendations = dto.recommendations.unwrap_or_default();
        if recommendations.is_empty() {
            recommendations.push(NO_RECOMMENDATIONS.to_string());
        }

        Self {
            total_consumption,
            per_device,
            recommendations,
            fetched_at: Utc::now(),
        }
    }
}

// ── Source seam ──────────────────────────────────────────────────────

/// Fetches the raw energy report from the hub.
#[async_trait]
pub trait EnergyReportSource: Send + Sync {
    async fn fetch_energy_report(&self) -> Result<homelink_api::EnergyReportDto, CoreError>;
}

#[async_trait]
impl EnergyReportSource for homelink_api::HubClient {
    async fn fetch_energy_report(&self) -> Result<homelink_api::EnergyReportDto, CoreError> {
        self.get_energy_report().await.map_err(|e| CoreError::FetchFailed {
            message: e.to_string(),
        })
    }
}

// ── Requester ────────────────────────────────────────────────────────

/// Fetches energy reports on demand and retains the latest success.
///
/// Cheaply cloneable; clones share the source and the retained report.
#[derive(Clone)]
pub struct AnalyticsRequester {
    source: Arc<dyn EnergyReportSource>,
    latest: Arc<watch::Sender<Option<Arc<EnergyReport>>>>,
}

impl AnalyticsRequester {
    pub fn new(source: Arc<dyn EnergyReportSource>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            source,
            latest: Arc::new(latest),
        }
    }

    /// Fetch a fresh report, replacing the retained one on success.
    ///
    /// On failure the previous report (if any) stays retained and visible;
    /// the caller decides how to surface the error.
    pub async fn run_report(&self) -> Result<Arc<EnergyReport>, CoreError> {
        match self.source.fetch_energy_report().await {
            Ok(dto) => {
                let report = Arc::new(EnergyReport::from_dto(dto));
                debug!(
                    devices = report.per_device.len(),
                    total = report.total_consumption,
                    "energy report fetched"
                );
                self.latest.send_replace(Some(Arc::clone(&report)));
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "energy report fetch failed, keeping previous report");
                Err(e)
            }
        }
    }

    /// The most recently fetched report, if any fetch has succeeded.
    pub fn latest(&self) -> Option<Arc<EnergyReport>> {
        self.latest.borrow().clone()
    }

    /// Subscribe to report replacements.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<EnergyReport>>> {
        self.latest.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use homelink_api::{DeviceEnergyDto, EnergyReportDto};

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<EnergyReportDto, CoreError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<EnergyReportDto, CoreError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl EnergyReportSource for ScriptedSource {
        async fn fetch_energy_report(&self) -> Result<EnergyReportDto, CoreError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CoreError::FetchFailed {
                    message: "script exhausted".into(),
                }))
        }
    }

    fn dto(
        total: Option<f64>,
        devices: &[(&str, f64, f64)],
        recommendations: Option<Vec<String>>,
    ) -> EnergyReportDto {
        EnergyReportDto {
            total_consumption: total,
            per_device: devices
                .iter()
                .map(|(id, power, duration)| {
                    (
                        (*id).to_string(),
                        DeviceEnergyDto {
                            power_usage: *power,
                            duration: Some(*duration),
                        },
                    )
                })
                .collect::<HashMap<_, _>>(),
            recommendations,
        }
    }

    #[tokio::test]
    async fn refresh_retains_latest_report() {
        let source = ScriptedSource::new(vec![Ok(dto(
            Some(225.0),
            &[("switch-2", 100.0, 1800.0), ("switch-1", 50.0, 3600.0)],
            Some(vec!["Reduce usage of switch-2".into()]),
        ))]);
        let requester = AnalyticsRequester::new(source);

        assert!(requester.latest().is_none());
        let report = requester.run_report().await.unwrap();

        assert_eq!(report.total_consumption, 225.0);
        // Devices come back sorted by id regardless of map order.
        let ids: Vec<&str> = report.per_device.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["switch-1", "switch-2"]);
        assert_eq!(requester.latest().unwrap(), report);
    }

    #[tokio::test]
    async fn empty_recommendations_become_placeholder() {
        let source = ScriptedSource::new(vec![Ok(dto(
            Some(50.0),
            &[("switch-1", 50.0, 3600.0)],
            Some(vec![]),
        ))]);
        let requester = AnalyticsRequester::new(source);

        let report = requester.run_report().await.unwrap();
        assert_eq!(report.recommendations, [NO_RECOMMENDATIONS]);
    }

    #[tokio::test]
    async fn missing_total_falls_back_to_device_sum() {
        let source = ScriptedSource::new(vec![Ok(dto(
            None,
            &[("switch-1", 50.0, 3600.0), ("switch-2", 100.0, 1800.0)],
            None,
        ))]);
        let requester = AnalyticsRequester::new(source);

        let report = requester.run_report().await.unwrap();
        assert_eq!(report.total_consumption, 150.0);
        assert_eq!(report.recommendations, [NO_RECOMMENDATIONS]);
    }

    #[tokio::test]
    async fn failed_fetch_preserves_previous_report() {
        let source = ScriptedSource::new(vec![
            Ok(dto(Some(50.0), &[("switch-1", 50.0, 3600.0)], None)),
            Err(CoreError::FetchFailed {
                message: "hub unreachable".into(),
            }),
        ]);
        let requester = AnalyticsRequester::new(source);

        let first = requester.run_report().await.unwrap();
        let second = requester.run_report().await;

        assert!(matches!(second, Err(CoreError::FetchFailed { .. })));
        assert_eq!(requester.latest().unwrap(), first);
    }
}
