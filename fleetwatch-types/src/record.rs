//! Record - one node's telemetry sample at one instant.

use chrono::{TimeZone, Utc};

use crate::Timestamp;

/// A single node's telemetry sample.
///
/// Records are immutable once produced. Two records of the same node with an
/// equal `updated_at` describe the same sample; consumers deduplicate on it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Record {
    /// CPU utilisation.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub cpu: CpuUsage,

    /// Physical memory.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub ram: Usage,

    /// Swap space.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub swap: Usage,

    /// Load averages.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub load: LoadAverage,

    /// Root filesystem.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub disk: Usage,

    /// Network rates and cumulative counters.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub network: NetworkStats,

    /// Open connection counts.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub connections: Connections,

    /// Seconds since boot.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub uptime: u64,

    /// Number of running processes.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub process: u64,

    /// Free-form message attached by the agent.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub message: String,

    /// Logical timestamp of this sample.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::timestamp"))]
    pub updated_at: Timestamp,
}

impl Record {
    /// Create an empty record stamped with the given timestamp.
    pub fn at(updated_at: Timestamp) -> Self {
        Self {
            updated_at,
            ..Default::default()
        }
    }

    /// Create a builder for records.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::new()
    }
}

/// CPU utilisation in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CpuUsage {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub usage: f64,
}

/// Used / total pair for memory, swap and disk, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Usage {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub total: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub used: u64,
}

impl Usage {
    /// Utilisation in percent, or 0 when the total is unknown.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.used as f64 / self.total as f64 * 100.0).min(100.0)
        }
    }
}

/// 1, 5 and 15 minute load averages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoadAverage {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub load1: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub load5: f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub load15: f64,
}

/// Network throughput.
///
/// `up` / `down` are instantaneous rates in bytes per second; `total_up` /
/// `total_down` are cumulative byte counters since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct NetworkStats {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub up: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub down: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub total_up: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub total_down: u64,
}

/// Open TCP / UDP connection counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Connections {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub tcp: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub udp: u64,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Record`].
#[derive(Debug, Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Create a new builder with an epoch timestamp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logical timestamp.
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.record.updated_at = ts;
        self
    }

    /// Set the logical timestamp from seconds since the Unix epoch.
    pub fn timestamp_secs(self, secs: i64) -> Self {
        self.timestamp_ms(secs.saturating_mul(1000))
    }

    /// Set the logical timestamp from milliseconds since the Unix epoch.
    pub fn timestamp_ms(self, ms: i64) -> Self {
        self.timestamp(timestamp_from_millis(ms))
    }

    /// Set CPU usage in percent.
    pub fn cpu(mut self, usage: f64) -> Self {
        self.record.cpu.usage = usage;
        self
    }

    /// Set memory usage in bytes.
    pub fn ram(mut self, used: u64, total: u64) -> Self {
        self.record.ram = Usage { total, used };
        self
    }

    /// Set swap usage in bytes.
    pub fn swap(mut self, used: u64, total: u64) -> Self {
        self.record.swap = Usage { total, used };
        self
    }

    /// Set disk usage in bytes.
    pub fn disk(mut self, used: u64, total: u64) -> Self {
        self.record.disk = Usage { total, used };
        self
    }

    /// Set load averages.
    pub fn load(mut self, load1: f64, load5: f64, load15: f64) -> Self {
        self.record.load = LoadAverage {
            load1,
            load5,
            load15,
        };
        self
    }

    /// Set instantaneous network rates (bytes per second).
    pub fn net_rate(mut self, up: u64, down: u64) -> Self {
        self.record.network.up = up;
        self.record.network.down = down;
        self
    }

    /// Set cumulative network counters (bytes).
    pub fn net_total(mut self, total_up: u64, total_down: u64) -> Self {
        self.record.network.total_up = total_up;
        self.record.network.total_down = total_down;
        self
    }

    /// Set connection counts.
    pub fn connections(mut self, tcp: u64, udp: u64) -> Self {
        self.record.connections = Connections { tcp, udp };
        self
    }

    /// Set uptime in seconds.
    pub fn uptime(mut self, secs: u64) -> Self {
        self.record.uptime = secs;
        self
    }

    /// Set the process count.
    pub fn process(mut self, count: u64) -> Self {
        self.record.process = count;
        self
    }

    /// Set the agent message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Build the record.
    pub fn build(self) -> Record {
        self.record
    }
}

/// Convert milliseconds since the Unix epoch, clamping out-of-range values to the epoch.
pub fn timestamp_from_millis(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
