//! Energy analytics report.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use homelink_core::{AnalyticsRequester, EnergyReport};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Serializable view ───────────────────────────────────────────────

#[derive(Serialize)]
struct ReportView {
    total_consumption: f64,
    per_device: Vec<DeviceView>,
    recommendations: Vec<String>,
}

#[derive(Serialize)]
struct DeviceView {
    id: String,
    power_usage: f64,
    duration_secs: f64,
}

impl From<&EnergyReport> for ReportView {
    fn from(report: &EnergyReport) -> Self {
        Self {
            total_consumption: report.total_consumption,
            per_device: report
                .per_device
                .iter()
                .map(|d| DeviceView {
                    id: d.id.to_string(),
                    power_usage: d.power_usage,
                    duration_secs: d.duration_secs,
                })
                .collect(),
            recommendations: report.recommendations.clone(),
        }
    }
}

#[derive(Tabled)]
struct EnergyRow {
    #[tabled(rename = "Device")]
    id: String,
    #[tabled(rename = "Power (W)")]
    power: String,
    #[tabled(rename = "Duration (s)")]
    duration: String,
}

impl From<&DeviceView> for EnergyRow {
    fn from(d: &DeviceView) -> Self {
        Self {
            id: d.id.clone(),
            power: format!("{:.1}", d.power_usage),
            duration: format!("{:.0}", d.duration_secs),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let client = util::hub_client(global)?;
    let requester = AnalyticsRequester::new(Arc::new(client));
    let report = requester.run_report().await?;
    let view = ReportView::from(report.as_ref());

    match global.output {
        OutputFormat::Table => {
            let table = output::render_list(
                &global.output,
                &view.per_device,
                |d| EnergyRow::from(d),
                |d| d.id.clone(),
            );
            output::print_output(&table, global.quiet);
            if !global.quiet {
                println!("\nTotal consumption: {:.1} Wh", view.total_consumption);
                println!("Recommendations:");
                for rec in &view.recommendations {
                    println!("  - {rec}");
                }
            }
            Ok(())
        }
        OutputFormat::Json | OutputFormat::Plain => {
            let rendered =
                output::render_single(&global.output, &view, |_| String::new(), |v| {
                    format!("{:.1}", v.total_consumption)
                });
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
    }
}
