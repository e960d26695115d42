//! Node health classification.

use fleetwatch_types::Record;
use serde::{Deserialize, Serialize};

/// Warning / critical utilisation levels in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub warning: f64,
    pub critical: f64,
}

impl Level {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    fn classify(&self, value: f64) -> HealthStatus {
        if value >= self.critical {
            HealthStatus::Critical
        } else if value >= self.warning {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Thresholds for health status computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu: Level,
    pub ram: Level,
    pub disk: Level,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: Level::new(80.0, 95.0),
            ram: Level::new(80.0, 95.0),
            disk: Level::new(85.0, 95.0),
        }
    }
}

impl Thresholds {
    /// Check that every warning level is below its critical level.
    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [("cpu", self.cpu), ("ram", self.ram), ("disk", self.disk)] {
            if !(level.warning >= 0.0 && level.warning <= level.critical) {
                return Err(format!(
                    "thresholds.{name}: warning ({}) must be between 0 and critical ({})",
                    level.warning, level.critical
                ));
            }
        }
        Ok(())
    }
}

/// Health status for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "OK",
            HealthStatus::Warning => "WARN",
            HealthStatus::Critical => "CRIT",
        }
    }
}

/// Health of one node and the measurement that decided it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeHealth {
    pub status: HealthStatus,
    /// Human-readable cause when not healthy.
    pub reason: Option<String>,
}

impl NodeHealth {
    /// Classify a node. Offline nodes, and online nodes without a record,
    /// are critical.
    pub fn assess(online: bool, record: Option<&Record>, thresholds: &Thresholds) -> Self {
        if !online {
            return Self::critical("offline");
        }
        let Some(record) = record else {
            return Self::critical("no data");
        };

        let checks = [
            ("cpu", record.cpu.usage, thresholds.cpu),
            ("ram", record.ram.percent(), thresholds.ram),
            ("disk", record.disk.percent(), thresholds.disk),
        ];

        let mut worst = Self {
            status: HealthStatus::Healthy,
            reason: None,
        };
        for (name, value, level) in checks {
            let status = level.classify(value);
            if status > worst.status {
                worst = Self {
                    status,
                    reason: Some(format!("{name} {value:.0}%")),
                };
            }
        }
        worst
    }

    fn critical(reason: &str) -> Self {
        Self {
            status: HealthStatus::Critical,
            reason: Some(reason.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cpu: f64, ram_pct: u64, disk_pct: u64) -> Record {
        Record::builder()
            .cpu(cpu)
            .ram(ram_pct, 100)
            .disk(disk_pct, 100)
            .build()
    }

    #[test]
    fn healthy_below_all_thresholds() {
        let h = NodeHealth::assess(true, Some(&record(10.0, 20, 30)), &Thresholds::default());
        assert_eq!(h.status, HealthStatus::Healthy);
        assert!(h.reason.is_none());
    }

    #[test]
    fn worst_measurement_wins() {
        let h = NodeHealth::assess(true, Some(&record(85.0, 96, 10)), &Thresholds::default());
        assert_eq!(h.status, HealthStatus::Critical);
        assert_eq!(h.reason.as_deref(), Some("ram 96%"));

        let h = NodeHealth::assess(true, Some(&record(10.0, 10, 90)), &Thresholds::default());
        assert_eq!(h.status, HealthStatus::Warning);
        assert_eq!(h.reason.as_deref(), Some("disk 90%"));
    }

    #[test]
    fn offline_and_missing_data_are_critical() {
        let t = Thresholds::default();
        assert_eq!(
            NodeHealth::assess(false, Some(&record(0.0, 0, 0)), &t).reason.as_deref(),
            Some("offline")
        );
        assert_eq!(NodeHealth::assess(true, None, &t).status, HealthStatus::Critical);
    }

    #[test]
    fn status_ordering() {
        assert!(HealthStatus::Critical > HealthStatus::Warning);
        assert!(HealthStatus::Warning > HealthStatus::Healthy);
        assert_eq!(HealthStatus::Warning.symbol(), "WARN");
    }

    #[test]
    fn validate_rejects_inverted_levels() {
        let mut t = Thresholds::default();
        assert!(t.validate().is_ok());
        t.cpu = Level::new(90.0, 50.0);
        assert!(t.validate().unwrap_err().contains("thresholds.cpu"));
    }
}
