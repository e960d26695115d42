//! Snapshot - a point-in-time view of the whole fleet.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Record, RecordBuilder};

/// A fleet-wide telemetry snapshot.
///
/// Produced wholesale by each fetch and never mutated afterwards; the next
/// fetch supersedes it rather than merging into it.
///
/// # Example
///
/// ```rust
/// use fleetwatch_types::Snapshot;
///
/// let snapshot = Snapshot::builder()
///     .online("edge-1")
///     .record("edge-1", |r| r.timestamp_secs(100).cpu(40.0))
///     .build();
///
/// assert!(snapshot.is_online("edge-1"));
/// assert_eq!(snapshot.record("edge-1").unwrap().cpu.usage, 40.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Snapshot {
    /// Ids of the nodes currently online.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub online: BTreeSet<String>,

    /// Latest record per node id.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub data: BTreeMap<String, Record>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check if the snapshot carries no records and no online ids.
    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.data.is_empty()
    }

    /// Number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of online node ids.
    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Whether the node is online in this snapshot.
    pub fn is_online(&self, id: &str) -> bool {
        self.online.contains(id)
    }

    /// Latest record for a node.
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.data.get(id)
    }

    /// Records of nodes that are also marked online.
    pub fn online_records(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.data.iter().filter(move |(id, _)| self.online.contains(id.as_str()))
    }
}

/// Builder for constructing [`Snapshot`] instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    online: BTreeSet<String>,
    data: BTreeMap<String, Record>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node as online.
    pub fn online(mut self, id: impl Into<String>) -> Self {
        self.online.insert(id.into());
        self
    }

    /// Add a record built using a closure.
    pub fn record<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(RecordBuilder) -> RecordBuilder,
    {
        self.data.insert(id.into(), f(RecordBuilder::new()).build());
        self
    }

    /// Add a pre-built record.
    pub fn with_record(mut self, id: impl Into<String>, record: Record) -> Self {
        self.data.insert(id.into(), record);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            online: self.online,
            data: self.data,
        }
    }
}
