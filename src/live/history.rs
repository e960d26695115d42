//! Per-node bounded history derived from a stream of snapshots.

use std::collections::VecDeque;

use fleetwatch_types::{Record, Snapshot, Timestamp};
use tracing::trace;

/// Default number of records kept per node.
pub const DEFAULT_HISTORY_CAPACITY: usize = 150;

/// Result of offering one snapshot to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The record was appended; `evicted` is true if the oldest one was dropped.
    Appended { evicted: bool },
    /// The snapshot carries no record for this node.
    Absent,
    /// A record with the same timestamp is already held.
    Duplicate,
    /// The record is older than the newest one held.
    OutOfOrder,
}

impl IngestOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, IngestOutcome::Appended { .. })
    }
}

/// Measurements that can be charted from a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Ram,
    NetUp,
    NetDown,
    Load,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Ram => "RAM",
            Metric::NetUp => "Net ↑",
            Metric::NetDown => "Net ↓",
            Metric::Load => "Load",
        }
    }

    /// Value of this metric in a record.
    pub fn value(&self, record: &Record) -> f64 {
        match self {
            Metric::Cpu => record.cpu.usage,
            Metric::Ram => record.ram.percent(),
            Metric::NetUp => record.network.up as f64,
            Metric::NetDown => record.network.down as f64,
            Metric::Load => record.load.load1,
        }
    }

    /// Fixed upper bound for percentage metrics.
    fn ceiling(&self) -> Option<f64> {
        match self {
            Metric::Cpu | Metric::Ram => Some(100.0),
            _ => None,
        }
    }
}

/// Bounded, ascending, timestamp-unique history of one node's records.
///
/// Records only ever enter at the back. A record whose timestamp is not
/// strictly newer than the newest one held is rejected, so the buffer never
/// reorders and never holds two records with the same timestamp.
///
/// # Example
///
/// ```
/// use fleetwatch::live::{EntityHistoryBuffer, IngestOutcome};
/// use fleetwatch_types::Snapshot;
///
/// let mut buffer = EntityHistoryBuffer::new("node-a", 2);
/// for ts in [1, 2, 3] {
///     let snapshot = Snapshot::builder().record("node-a", |r| r.timestamp_secs(ts)).build();
///     buffer.ingest(&snapshot);
/// }
///
/// let kept: Vec<i64> = buffer.timestamps().map(|t| t.timestamp()).collect();
/// assert_eq!(kept, vec![2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct EntityHistoryBuffer {
    entity_id: String,
    capacity: usize,
    records: VecDeque<Record>,
}

impl EntityHistoryBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(entity_id: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entity_id: entity_id.into(),
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Create a buffer pre-populated from a bulk history fetch.
    ///
    /// The seed is sorted, deduplicated by timestamp and truncated to the
    /// newest `capacity` entries.
    pub fn seeded(entity_id: impl Into<String>, capacity: usize, mut seed: Vec<Record>) -> Self {
        let mut buffer = Self::new(entity_id, capacity);
        seed.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        seed.dedup_by(|later, earlier| later.updated_at == earlier.updated_at);

        let skip = seed.len().saturating_sub(buffer.capacity);
        buffer.records.extend(seed.into_iter().skip(skip));
        buffer
    }

    /// Offer a snapshot; only this buffer's node is looked at.
    pub fn ingest(&mut self, snapshot: &Snapshot) -> IngestOutcome {
        match snapshot.record(&self.entity_id) {
            Some(record) => self.push(record),
            None => IngestOutcome::Absent,
        }
    }

    /// Offer a single record of this buffer's node.
    pub fn push(&mut self, record: &Record) -> IngestOutcome {
        if let Some(last) = self.records.back() {
            if record.updated_at <= last.updated_at {
                let outcome = if self.contains_timestamp(&record.updated_at) {
                    IngestOutcome::Duplicate
                } else {
                    IngestOutcome::OutOfOrder
                };
                trace!(entity = %self.entity_id, ?outcome, "record not appended");
                return outcome;
            }
        }

        self.records.push_back(record.clone());
        let evicted = self.records.len() > self.capacity;
        if evicted {
            self.records.pop_front();
        }
        IngestOutcome::Appended { evicted }
    }

    fn contains_timestamp(&self, ts: &Timestamp) -> bool {
        self.records
            .binary_search_by(|r| r.updated_at.cmp(ts))
            .is_ok()
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records, oldest first.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &Record> + ExactSizeIterator {
        self.records.iter()
    }

    /// Newest record.
    pub fn latest(&self) -> Option<&Record> {
        self.records.back()
    }

    /// Timestamps, oldest first.
    pub fn timestamps(&self) -> impl Iterator<Item = &Timestamp> {
        self.records.iter().map(|r| &r.updated_at)
    }

    /// Raw values of a metric, oldest first.
    pub fn series(&self, metric: Metric) -> Vec<f64> {
        self.records.iter().map(|r| metric.value(r)).collect()
    }

    /// Values of a metric scaled to 0-7 for 8 bar levels.
    ///
    /// Percentages use a fixed 0-100 scale; other metrics scale to the
    /// largest value in the window. Only the newest `width` points are used.
    pub fn sparkline(&self, metric: Metric, width: usize) -> Vec<u8> {
        let skip = self.records.len().saturating_sub(width);
        let values: Vec<f64> = self
            .records
            .iter()
            .skip(skip)
            .map(|r| metric.value(r).max(0.0))
            .collect();

        if values.is_empty() {
            return Vec::new();
        }

        let max = metric
            .ceiling()
            .unwrap_or_else(|| values.iter().copied().fold(0.0, f64::max))
            .max(f64::EPSILON);

        values
            .iter()
            .map(|&v| ((v / max * 7.0).round() as u8).min(7))
            .collect()
    }

    /// Mean of a metric over the window.
    pub fn average(&self, metric: Metric) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let sum: f64 = self.records.iter().map(|r| metric.value(r)).sum();
        Some(sum / self.records.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(entity: &str, ts: i64) -> Snapshot {
        Snapshot::builder()
            .online(entity)
            .record(entity, |r| r.timestamp_secs(ts).cpu(ts as f64))
            .build()
    }

    fn stamps(buffer: &EntityHistoryBuffer) -> Vec<i64> {
        buffer.timestamps().map(|t| t.timestamp()).collect()
    }

    #[test]
    fn capacity_three_scenario() {
        let mut buffer = EntityHistoryBuffer::new("n", 3);

        for ts in [1, 2, 3] {
            assert!(buffer.ingest(&snap("n", ts)).is_appended());
        }
        assert_eq!(stamps(&buffer), vec![1, 2, 3]);

        assert_eq!(
            buffer.ingest(&snap("n", 4)),
            IngestOutcome::Appended { evicted: true }
        );
        assert_eq!(stamps(&buffer), vec![2, 3, 4]);

        assert_eq!(buffer.ingest(&snap("n", 3)), IngestOutcome::Duplicate);
        assert_eq!(stamps(&buffer), vec![2, 3, 4]);

        assert_eq!(buffer.ingest(&snap("n", 2)), IngestOutcome::Duplicate);
        assert_eq!(stamps(&buffer), vec![2, 3, 4]);
    }

    #[test]
    fn older_unseen_record_is_out_of_order() {
        let mut buffer = EntityHistoryBuffer::new("n", 5);
        buffer.ingest(&snap("n", 10));
        buffer.ingest(&snap("n", 20));

        assert_eq!(buffer.ingest(&snap("n", 15)), IngestOutcome::OutOfOrder);
        assert_eq!(buffer.ingest(&snap("n", 5)), IngestOutcome::OutOfOrder);
        assert_eq!(stamps(&buffer), vec![10, 20]);
    }

    #[test]
    fn snapshot_without_entity_is_absent() {
        let mut buffer = EntityHistoryBuffer::new("n", 5);
        assert_eq!(buffer.ingest(&snap("other", 1)), IngestOutcome::Absent);
        assert!(buffer.is_empty());
    }

    #[test]
    fn same_snapshot_twice_appends_once() {
        let mut buffer = EntityHistoryBuffer::new("n", 5);
        let s = snap("n", 7);
        buffer.ingest(&s);
        buffer.ingest(&s);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn never_exceeds_capacity_and_stays_strictly_increasing() {
        let mut buffer = EntityHistoryBuffer::new("n", 4);
        let sequence = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 10, 10, 11];
        for ts in sequence {
            buffer.ingest(&snap("n", ts));
            assert!(buffer.len() <= 4);
            let s = stamps(&buffer);
            assert!(s.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(stamps(&buffer), vec![5, 9, 10, 11]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = EntityHistoryBuffer::new("n", 0);
        assert_eq!(buffer.capacity(), 1);
        buffer.ingest(&snap("n", 1));
        buffer.ingest(&snap("n", 2));
        assert_eq!(stamps(&buffer), vec![2]);
    }

    #[test]
    fn seed_is_sorted_deduplicated_and_truncated() {
        let seed: Vec<Record> = [5, 1, 3, 3, 4, 2]
            .iter()
            .map(|&ts| Record::builder().timestamp_secs(ts).build())
            .collect();

        let buffer = EntityHistoryBuffer::seeded("n", 3, seed);
        assert_eq!(stamps(&buffer), vec![3, 4, 5]);
    }

    #[test]
    fn live_ingest_after_seed_respects_seed_order() {
        let seed = (1..=3)
            .map(|ts| Record::builder().timestamp_secs(ts).build())
            .collect();
        let mut buffer = EntityHistoryBuffer::seeded("n", 3, seed);

        assert_eq!(buffer.ingest(&snap("n", 3)), IngestOutcome::Duplicate);
        assert!(buffer.ingest(&snap("n", 4)).is_appended());
        assert_eq!(stamps(&buffer), vec![2, 3, 4]);
    }

    #[test]
    fn sparkline_uses_fixed_scale_for_percentages() {
        let mut buffer = EntityHistoryBuffer::new("n", 10);
        for (ts, cpu) in [(1, 0.0), (2, 50.0), (3, 100.0)] {
            let s = Snapshot::builder()
                .record("n", |r| r.timestamp_secs(ts).cpu(cpu))
                .build();
            buffer.ingest(&s);
        }
        assert_eq!(buffer.sparkline(Metric::Cpu, 10), vec![0, 4, 7]);
        assert_eq!(buffer.sparkline(Metric::Cpu, 2), vec![4, 7]);
    }

    #[test]
    fn sparkline_scales_rates_to_window_max() {
        let mut buffer = EntityHistoryBuffer::new("n", 10);
        for (ts, down) in [(1, 0), (2, 500), (3, 1000)] {
            let s = Snapshot::builder()
                .record("n", |r| r.timestamp_secs(ts).net_rate(0, down))
                .build();
            buffer.ingest(&s);
        }
        assert_eq!(buffer.sparkline(Metric::NetDown, 10), vec![0, 4, 7]);
        assert_eq!(buffer.sparkline(Metric::NetUp, 10), vec![0, 0, 0]);
        assert!(EntityHistoryBuffer::new("x", 3).sparkline(Metric::Cpu, 5).is_empty());
    }

    #[test]
    fn average_over_window() {
        let mut buffer = EntityHistoryBuffer::new("n", 10);
        buffer.ingest(&snap("n", 2));
        buffer.ingest(&snap("n", 4));
        assert_eq!(buffer.average(Metric::Cpu), Some(3.0));
        assert_eq!(EntityHistoryBuffer::new("x", 1).average(Metric::Cpu), None);
    }
}
