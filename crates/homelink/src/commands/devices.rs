//! Device listing.

use serde::Serialize;
use tabled::Tabled;

use homelink_core::{CoreError, EntityId, EntitySnapshot};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

/// One device as returned by the hub, id plus its open field map.
#[derive(Serialize)]
struct DeviceEntry {
    id: EntityId,
    #[serde(flatten)]
    snapshot: EntitySnapshot,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Brightness")]
    brightness: String,
    #[tabled(rename = "Motion")]
    motion: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Power (W)")]
    power: String,
}

impl From<&DeviceEntry> for DeviceRow {
    fn from(entry: &DeviceEntry) -> Self {
        let snap = &entry.snapshot;
        Self {
            id: entry.id.to_string(),
            state: snap
                .flag("is_on")
                .map(|on| if on { "on" } else { "off" }.to_string())
                .or_else(|| snap.text("state").map(str::to_string))
                .unwrap_or_else(|| "-".into()),
            brightness: snap
                .integer("brightness")
                .map_or_else(|| "-".into(), |b| b.to_string()),
            motion: snap.flag("motion_detected").map_or_else(
                || "-".into(),
                |m| if m { "detected" } else { "clear" }.to_string(),
            ),
            location: snap.text("location").unwrap_or("-").to_string(),
            power: snap
                .number("power_consumption")
                .map_or_else(|| "-".into(), |p| format!("{p:.1}")),
        }
    }
}

fn detail(entry: &DeviceEntry) -> String {
    let mut lines = vec![format!("ID: {}", entry.id)];
    for (field, value) in entry.snapshot.fields() {
        lines.push(format!("{field}: {value}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = util::hub_client(global)?;
    let devices = client.get_devices().await.map_err(CoreError::from)?;

    let mut entries: Vec<DeviceEntry> = devices
        .into_iter()
        .map(|(id, fields)| DeviceEntry {
            id: EntityId::from(id),
            snapshot: EntitySnapshot::from(fields),
        })
        .collect();
    entries.sort_by(|a, b| a.id.cmp(&b.id));

    if let Some(wanted) = &args.id {
        let entry = entries
            .into_iter()
            .find(|e| e.id.as_str() == wanted)
            .ok_or_else(|| CliError::DeviceNotFound { id: wanted.clone() })?;
        let rendered = output::render_single(&global.output, &entry, detail, |e| e.id.to_string());
        output::print_output(&rendered, global.quiet);
        return Ok(());
    }

    let rendered = output::render_list(&global.output, &entries, |e| DeviceRow::from(e), |e| {
        e.id.to_string()
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
