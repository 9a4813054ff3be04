use std::time::Duration;

use serde::Serialize;

use crate::db::ResultStore;
use crate::errors::ScanhiveError;
use crate::models::finding::{Severity, SeverityCounts};
use crate::models::scan::{ScanRecord, ScanStatus};

/// Finding totals and timing for one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub scan_id: String,
    pub status: ScanStatus,
    pub counts: SeverityCounts,
    pub total_findings: u64,
    pub duration_secs: Option<f64>,
}

impl ScanSummary {
    pub async fn compute(store: &dyn ResultStore, record: &ScanRecord) -> Result<Self, ScanhiveError> {
        let counts = store.finding_counts(&record.id).await?;
        Ok(Self::from_counts(record, counts))
    }

    pub fn from_counts(record: &ScanRecord, counts: SeverityCounts) -> Self {
        let duration_secs = match (record.started_at, record.completed_at) {
            (Some(start), Some(end)) => (end - start).to_std().ok().map(|d| d.as_secs_f64()),
            _ => None,
        };
        Self {
            scan_id: record.id.clone(),
            status: record.status,
            counts,
            total_findings: counts.total(),
            duration_secs,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs_f64)
    }

    pub fn log_line(&self) -> String {
        completion_line(&self.counts)
    }
}

/// Closing log entry of a completed scan.
pub fn completion_line(counts: &SeverityCounts) -> String {
    format!("Scan completed with {} findings ({})", counts.total(), format_counts(counts))
}

/// `critical=1, high=0, ...` in severity order.
pub fn format_counts(counts: &SeverityCounts) -> String {
    Severity::ALL
        .iter()
        .map(|s| format!("{}={}", s, counts.get(*s)))
        .collect::<Vec<_>>()
        .join(", ")
}
