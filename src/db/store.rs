use async_trait::async_trait;

use crate::errors::ScanhiveError;
use crate::models::finding::{Finding, SeverityCounts};
use crate::models::log_entry::{LogEntry, LogLevel};
use crate::models::scan::{ScanFilter, ScanRecord, ScanStatus};
use super::Database;

/// Persistence contract the engine writes scan state through.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create_scan(&self, record: &ScanRecord) -> Result<(), ScanhiveError>;
    async fn get_scan(&self, id: &str) -> Result<Option<ScanRecord>, ScanhiveError>;
    async fn list_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, ScanhiveError>;

    /// Applies only when the stored status may legally move to `status`.
    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        progress: Option<u8>,
        error: Option<&str>,
    ) -> Result<bool, ScanhiveError>;

    async fn append_finding(&self, finding: &Finding) -> Result<(), ScanhiveError>;
    async fn append_log(&self, scan_id: &str, level: LogLevel, message: &str) -> Result<(), ScanhiveError>;
    async fn delete_scan(&self, id: &str) -> Result<bool, ScanhiveError>;

    async fn get_findings(&self, scan_id: &str) -> Result<Vec<Finding>, ScanhiveError>;
    async fn get_logs(&self, scan_id: &str, tail: Option<usize>) -> Result<Vec<LogEntry>, ScanhiveError>;
    async fn finding_counts(&self, scan_id: &str) -> Result<SeverityCounts, ScanhiveError>;
}

#[async_trait]
impl ResultStore for Database {
    async fn create_scan(&self, record: &ScanRecord) -> Result<(), ScanhiveError> {
        self.insert_scan(record)
    }

    async fn get_scan(&self, id: &str) -> Result<Option<ScanRecord>, ScanhiveError> {
        self.select_scan(id)
    }

    async fn list_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, ScanhiveError> {
        self.select_scans(filter)
    }

    async fn update_status(
        &self,
        id: &str,
        status: ScanStatus,
        progress: Option<u8>,
        error: Option<&str>,
    ) -> Result<bool, ScanhiveError> {
        self.update_scan_status(id, status, progress, error)
    }

    async fn append_finding(&self, finding: &Finding) -> Result<(), ScanhiveError> {
        self.insert_finding(finding)
    }

    async fn append_log(&self, scan_id: &str, level: LogLevel, message: &str) -> Result<(), ScanhiveError> {
        self.insert_log(scan_id, level, message).map(|_| ())
    }

    async fn delete_scan(&self, id: &str) -> Result<bool, ScanhiveError> {
        self.remove_scan(id)
    }

    async fn get_findings(&self, scan_id: &str) -> Result<Vec<Finding>, ScanhiveError> {
        self.select_findings(scan_id)
    }

    async fn get_logs(&self, scan_id: &str, tail: Option<usize>) -> Result<Vec<LogEntry>, ScanhiveError> {
        self.select_logs(scan_id, tail)
    }

    async fn finding_counts(&self, scan_id: &str) -> Result<SeverityCounts, ScanhiveError> {
        self.count_findings(scan_id)
    }
}
