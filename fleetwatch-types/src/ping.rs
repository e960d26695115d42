//! Ping task statistics.

/// One latency sample of a ping task.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PingRecord {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub client: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub task_id: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub time: String,
    /// Round-trip time in milliseconds; negative values mark a lost probe.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub value: f64,
}

/// Aggregate statistics for one ping task over the requested window.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PingTask {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub id: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub name: String,
    /// Probe interval in seconds.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub interval: u64,
    /// Packet loss in percent.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub loss: f64,
    pub p99: Option<f64>,
    pub p50: Option<f64>,
    pub p99_p50_ratio: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub latest: Option<f64>,
    pub total: Option<u64>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: Option<String>,
}

impl PingTask {
    /// Create a task with a name and loss percentage.
    pub fn new(id: u64, name: impl Into<String>, loss: f64) -> Self {
        Self {
            id,
            name: name.into(),
            loss,
            ..Default::default()
        }
    }

    /// Set the p99/p50 ratio.
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.p99_p50_ratio = Some(ratio);
        self
    }
}

/// Response of the ping records call.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PingReport {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub count: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub records: Vec<PingRecord>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub tasks: Vec<PingTask>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn deserialize_report() {
        let json = r#"{
            "count": 2,
            "records": [
                {"client": "n1", "task_id": 1, "time": "2025-01-01T00:00:00Z", "value": 31.5},
                {"client": "n1", "task_id": 1, "time": "2025-01-01T00:01:00Z", "value": -1}
            ],
            "tasks": [
                {"id": 1, "name": "CT", "interval": 60, "loss": 50, "p99": 40.0, "p50": 20.0,
                 "p99_p50_ratio": 2.0, "type": "icmp"}
            ],
            "from": "2025-01-01T00:00:00Z"
        }"#;

        let report: PingReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.records[1].value, -1.0);
        assert_eq!(report.tasks[0].loss, 50.0);
        assert_eq!(report.tasks[0].p99_p50_ratio, Some(2.0));
        assert_eq!(report.tasks[0].kind.as_deref(), Some("icmp"));
        assert_eq!(report.tasks[0].min, None);
    }

    #[test]
    fn missing_tasks_decode_empty() {
        let report: PingReport = serde_json::from_str(r#"{"count": 0, "records": null}"#).unwrap();
        assert!(report.records.is_empty());
        assert!(report.tasks.is_empty());
    }
}
