//! Ping statistics summary.

use fleetwatch_types::PingReport;
use serde::Serialize;

use crate::source::FetchError;

/// Averages over a node's ping tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PingStats {
    /// Mean packet loss across tasks, in percent.
    pub avg_loss: f64,
    /// Mean p99/p50 latency ratio across tasks that report one.
    pub avg_volatility: f64,
    pub has_data: bool,
}

impl PingStats {
    /// Summarize a report. Without both records and tasks there is no data.
    pub fn from_report(report: &PingReport) -> Self {
        if report.records.is_empty() || report.tasks.is_empty() {
            return Self::default();
        }

        let avg_loss =
            report.tasks.iter().map(|t| t.loss).sum::<f64>() / report.tasks.len() as f64;

        let ratios: Vec<f64> = report
            .tasks
            .iter()
            .filter_map(|t| t.p99_p50_ratio)
            .filter(|r| *r > 0.0)
            .collect();
        let avg_volatility = if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };

        Self {
            avg_loss,
            avg_volatility,
            has_data: true,
        }
    }

    /// Summarize a fetch result; a failed fetch means no data.
    pub fn from_result(result: &Result<PingReport, FetchError>) -> Self {
        match result {
            Ok(report) => Self::from_report(report),
            Err(_) => Self::default(),
        }
    }
}
