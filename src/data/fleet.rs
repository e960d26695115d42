//! Per-node rows and per-region rollups for display.

use std::collections::BTreeMap;
use std::time::Instant;

use fleetwatch_types::{NodeInfo, Record, Roster, Snapshot};
use serde::Serialize;

use super::aggregate::FleetSummary;
use super::health::{HealthStatus, NodeHealth, Thresholds};

/// One roster entry joined with its live state.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRow {
    pub node: NodeInfo,
    pub online: bool,
    pub record: Option<Record>,
    pub health: NodeHealth,
}

impl NodeRow {
    pub fn new(node: &NodeInfo, snapshot: Option<&Snapshot>, thresholds: &Thresholds) -> Self {
        let online = snapshot.is_some_and(|s| s.is_online(&node.uuid));
        let record = snapshot.and_then(|s| s.record(&node.uuid)).cloned();
        let health = NodeHealth::assess(online, record.as_ref(), thresholds);
        Self {
            node: node.clone(),
            online,
            record,
            health,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.node.uuid
    }

    pub fn name(&self) -> &str {
        self.node.display_name()
    }

    pub fn cpu(&self) -> Option<f64> {
        self.live().map(|r| r.cpu.usage)
    }

    pub fn ram(&self) -> Option<f64> {
        self.live().map(|r| r.ram.percent())
    }

    pub fn disk(&self) -> Option<f64> {
        self.live().map(|r| r.disk.percent())
    }

    /// Current (up, down) rate in bytes per second.
    pub fn speed(&self) -> Option<(u64, u64)> {
        self.live().map(|r| (r.network.up, r.network.down))
    }

    /// The record, but only while the node is online.
    fn live(&self) -> Option<&Record> {
        self.record.as_ref().filter(|_| self.online)
    }
}

/// Node count and online count for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRow {
    pub region: String,
    pub total: usize,
    pub online: usize,
}

/// Everything the views need from one published snapshot.
#[derive(Debug, Clone)]
pub struct FleetData {
    /// Rows in health order (critical first), then by name.
    pub nodes: Vec<NodeRow>,
    pub regions: Vec<RegionRow>,
    pub summary: FleetSummary,
    /// Hub sequence of the snapshot this was built from; 0 before any.
    pub sequence: u64,
    pub last_updated: Instant,
}

impl FleetData {
    pub fn from_snapshot(
        roster: &Roster,
        snapshot: Option<&Snapshot>,
        sequence: u64,
        thresholds: &Thresholds,
    ) -> Self {
        let mut nodes: Vec<NodeRow> = roster
            .iter()
            .map(|node| NodeRow::new(node, snapshot, thresholds))
            .collect();
        nodes.sort_by(|a, b| {
            b.health
                .status
                .cmp(&a.health.status)
                .then_with(|| a.name().cmp(b.name()))
        });

        Self {
            regions: region_rows(roster, snapshot),
            summary: FleetSummary::compute(roster, snapshot),
            nodes,
            sequence,
            last_updated: Instant::now(),
        }
    }

    pub fn node(&self, uuid: &str) -> Option<&NodeRow> {
        self.nodes.iter().find(|n| n.uuid() == uuid)
    }

    /// Number of nodes at each status: (healthy, warning, critical).
    pub fn health_counts(&self) -> (usize, usize, usize) {
        self.nodes
            .iter()
            .fold((0, 0, 0), |(ok, warn, crit), row| match row.health.status {
                HealthStatus::Healthy => (ok + 1, warn, crit),
                HealthStatus::Warning => (ok, warn + 1, crit),
                HealthStatus::Critical => (ok, warn, crit + 1),
            })
    }
}

/// Region rollup; nodes without a region are grouped under an empty name.
fn region_rows(roster: &Roster, snapshot: Option<&Snapshot>) -> Vec<RegionRow> {
    let mut by_region: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for node in roster {
        let entry = by_region.entry(node.region.trim()).or_default();
        entry.0 += 1;
        if snapshot.is_some_and(|s| s.is_online(&node.uuid)) {
            entry.1 += 1;
        }
    }

    by_region
        .into_iter()
        .map(|(region, (total, online))| RegionRow {
            region: region.to_string(),
            total,
            online,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(vec![
            NodeInfo::new("a").with_name("alpha").with_region("HK"),
            NodeInfo::new("b").with_name("bravo").with_region("HK"),
            NodeInfo::new("c").with_name("charlie").with_region("US"),
            NodeInfo::new("d").with_name("delta"),
        ])
    }

    fn snapshot() -> Snapshot {
        Snapshot::builder()
            .online("a")
            .online("b")
            .online("c")
            .record("a", |r| r.timestamp_secs(1).cpu(10.0).ram(10, 100).net_rate(5, 7))
            .record("b", |r| r.timestamp_secs(1).cpu(90.0).ram(10, 100))
            .record("c", |r| r.timestamp_secs(1).cpu(99.0).ram(10, 100))
            .record("d", |r| r.timestamp_secs(1).cpu(1.0))
            .build()
    }

    #[test]
    fn rows_sorted_critical_first() {
        let data = FleetData::from_snapshot(&roster(), Some(&snapshot()), 3, &Thresholds::default());

        let order: Vec<&str> = data.nodes.iter().map(|n| n.uuid()).collect();
        assert_eq!(order, vec!["c", "d", "b", "a"]);
        assert_eq!(data.health_counts(), (1, 1, 2));
        assert_eq!(data.sequence, 3);
    }

    #[test]
    fn offline_node_hides_its_record() {
        let data = FleetData::from_snapshot(&roster(), Some(&snapshot()), 1, &Thresholds::default());
        let d = data.node("d").unwrap();

        assert!(!d.online);
        assert!(d.record.is_some());
        assert_eq!(d.cpu(), None);
        assert_eq!(d.health.reason.as_deref(), Some("offline"));

        assert_eq!(data.node("a").unwrap().speed(), Some((5, 7)));
    }

    #[test]
    fn regions_count_roster_and_online() {
        let data = FleetData::from_snapshot(&roster(), Some(&snapshot()), 1, &Thresholds::default());
        assert_eq!(
            data.regions,
            vec![
                RegionRow { region: String::new(), total: 1, online: 0 },
                RegionRow { region: "HK".into(), total: 2, online: 2 },
                RegionRow { region: "US".into(), total: 1, online: 1 },
            ]
        );
        assert_eq!(data.summary.online_label(), "3 / 4");
    }

    #[test]
    fn no_snapshot_yet() {
        let data = FleetData::from_snapshot(&roster(), None, 0, &Thresholds::default());
        assert!(data.nodes.iter().all(|n| !n.online));
        assert_eq!(data.summary.online, 0);
    }
}
