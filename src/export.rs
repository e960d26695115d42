//! JSON export of the current fleet state.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{FleetData, FleetSummary, HealthStatus, NodeRow, RegionRow, Thresholds};
use crate::live::{LiveData, TickOutcome};

/// Top-level export document.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub source: &'a str,
    /// Hub sequence of the snapshot exported.
    pub sequence: u64,
    pub summary: ExportSummary<'a>,
    pub regions: &'a [RegionRow],
    pub nodes: Vec<ExportNode<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ExportSummary<'a> {
    #[serde(flatten)]
    pub fleet: &'a FleetSummary,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

#[derive(Debug, Serialize)]
pub struct ExportNode<'a> {
    pub uuid: &'a str,
    pub name: &'a str,
    pub region: &'a str,
    pub group: &'a str,
    pub online: bool,
    pub health: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
    pub cpu: Option<f64>,
    pub ram: Option<f64>,
    pub disk: Option<f64>,
    pub net_up: Option<u64>,
    pub net_down: Option<u64>,
    pub uptime: Option<u64>,
}

impl<'a> ExportNode<'a> {
    fn from_row(row: &'a NodeRow) -> Self {
        let speed = row.speed();
        Self {
            uuid: row.uuid(),
            name: row.name(),
            region: &row.node.region,
            group: &row.node.group,
            online: row.online,
            health: row.health.status,
            reason: row.health.reason.as_deref(),
            cpu: row.cpu(),
            ram: row.ram(),
            disk: row.disk(),
            net_up: speed.map(|(up, _)| up),
            net_down: speed.map(|(_, down)| down),
            uptime: row.record.as_ref().filter(|_| row.online).map(|r| r.uptime),
        }
    }
}

impl<'a> ExportDocument<'a> {
    pub fn new(data: &'a FleetData, source: &'a str) -> Self {
        let (healthy, warning, critical) = data.health_counts();
        Self {
            generated_at: Utc::now(),
            source,
            sequence: data.sequence,
            summary: ExportSummary {
                fleet: &data.summary,
                healthy,
                warning,
                critical,
            },
            regions: &data.regions,
            nodes: data.nodes.iter().map(ExportNode::from_row).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize export")
    }
}

/// Write `data` to `path` as pretty JSON.
pub fn write_export(path: &Path, data: &FleetData, source: &str) -> Result<()> {
    let json = ExportDocument::new(data, source).to_json()?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Fetch once and export, without starting any timers.
pub async fn export_once(live: &LiveData, thresholds: &Thresholds, path: &Path) -> Result<FleetData> {
    match live.refresh_once().await {
        TickOutcome::Published(_) => {}
        _ => bail!(
            "failed to fetch snapshot from {}: {}",
            live.description(),
            live.scheduler().last_error().unwrap_or_else(|| "unknown error".to_string())
        ),
    }

    let snapshot = live.latest();
    let data = FleetData::from_snapshot(
        &live.roster(),
        snapshot.as_deref(),
        live.hub().sequence(),
        thresholds,
    );
    write_export(path, &data, live.description())?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_types::{NodeInfo, Roster, Snapshot};

    fn data() -> FleetData {
        let roster = Roster::new(vec![
            NodeInfo::new("a").with_name("alpha").with_region("HK"),
            NodeInfo::new("b").with_name("bravo").with_region("US"),
        ]);
        let snapshot = Snapshot::builder()
            .online("a")
            .record("a", |r| r.timestamp_secs(1).cpu(12.5).net_rate(100, 200).uptime(60))
            .build();
        FleetData::from_snapshot(&roster, Some(&snapshot), 7, &Thresholds::default())
    }

    #[test]
    fn document_shape() {
        let data = data();
        let json = ExportDocument::new(&data, "file: test.json").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source"], "file: test.json");
        assert_eq!(value["sequence"], 7);
        assert_eq!(value["summary"]["online"], 1);
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["critical"], 1);
        assert_eq!(value["summary"]["speed"]["down"], 200);
        assert_eq!(value["regions"].as_array().unwrap().len(), 2);

        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes[0]["uuid"], "b");
        assert_eq!(nodes[0]["health"], "critical");
        assert_eq!(nodes[0]["reason"], "offline");
        assert!(nodes[0]["cpu"].is_null());
        assert_eq!(nodes[1]["cpu"], 12.5);
        assert_eq!(nodes[1]["uptime"], 60);
        assert!(nodes[1].get("reason").is_none());
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        write_export(&path, &data(), "test").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"generated_at\""));
    }
}
