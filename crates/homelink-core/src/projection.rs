// ── Presentation projections ──
//
// Pure helpers that turn core values into renderer-friendly shapes. No
// presentation crate is touched here; the CLI (or any other frontend)
// owns the actual markup.

use std::time::Duration;

use crate::analytics::EnergyReport;

/// Parallel label/value arrays for a bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Project an energy report into a per-device power-usage bar series.
///
/// Label order follows the report's device order, which is already sorted
/// by entity id, so repeated renders of the same report are identical.
pub fn energy_bar_series(report: &EnergyReport) -> BarSeries {
    let mut labels = Vec::with_capacity(report.per_device.len());
    let mut values = Vec::with_capacity(report.per_device.len());
    for device in &report.per_device {
        labels.push(device.id.to_string());
        values.push(device.power_usage);
    }
    BarSeries { labels, values }
}

/// Format an uptime duration as `H:MM` (whole minutes, hours unpadded).
pub fn format_uptime(uptime: Duration) -> String {
    let minutes = uptime.as_secs() / 60;
    format!("{}:{:02}", minutes / 60, minutes % 60)
}
