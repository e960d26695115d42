//! Fleet-wide reductions over the roster and the latest snapshot.
//!
//! All functions are total: a missing snapshot, missing records or zeroed
//! measurements simply contribute nothing. Nothing is cached between calls.

use std::collections::BTreeMap;

use fleetwatch_types::{Roster, Snapshot};
use serde::Serialize;

/// Upload / download pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Throughput {
    pub up: u64,
    pub down: u64,
}

/// Number of online nodes as reported by the snapshot.
pub fn online_count(snapshot: Option<&Snapshot>) -> usize {
    snapshot.map_or(0, Snapshot::online_count)
}

/// Online node count per region.
///
/// Only nodes present in the roster and online in the snapshot count. Nodes
/// with a blank region are grouped under the empty string.
pub fn region_online_counts(roster: &Roster, snapshot: Option<&Snapshot>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    let Some(snapshot) = snapshot else {
        return counts;
    };
    for node in roster {
        if snapshot.is_online(&node.uuid) {
            *counts.entry(node.region.trim().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Number of distinct regions with at least one online roster node.
pub fn region_count(roster: &Roster, snapshot: Option<&Snapshot>) -> usize {
    region_online_counts(roster, snapshot).len()
}

/// Summed cumulative traffic counters over online nodes.
pub fn traffic_totals(snapshot: Option<&Snapshot>) -> Throughput {
    sum_online(snapshot, |r| (r.network.total_up, r.network.total_down))
}

/// Summed instantaneous network rates over online nodes.
pub fn network_speed(snapshot: Option<&Snapshot>) -> Throughput {
    sum_online(snapshot, |r| (r.network.up, r.network.down))
}

fn sum_online<F>(snapshot: Option<&Snapshot>, pick: F) -> Throughput
where
    F: Fn(&fleetwatch_types::Record) -> (u64, u64),
{
    let Some(snapshot) = snapshot else {
        return Throughput::default();
    };
    snapshot
        .online_records()
        .map(|(_, record)| pick(record))
        .fold(Throughput::default(), |acc, (up, down)| Throughput {
            up: acc.up.saturating_add(up),
            down: acc.down.saturating_add(down),
        })
}

/// Values behind the dashboard's status cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub online: usize,
    pub total: usize,
    pub regions: usize,
    pub traffic: Throughput,
    pub speed: Throughput,
}

impl FleetSummary {
    pub fn compute(roster: &Roster, snapshot: Option<&Snapshot>) -> Self {
        Self {
            online: online_count(snapshot),
            total: roster.len(),
            regions: region_count(roster, snapshot),
            traffic: traffic_totals(snapshot),
            speed: network_speed(snapshot),
        }
    }

    /// "online / total" as shown on the status card.
    pub fn online_label(&self) -> String {
        format!("{} / {}", self.online, self.total)
    }
}
