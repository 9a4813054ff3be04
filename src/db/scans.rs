use rusqlite::OptionalExtension;

use crate::errors::ScanhiveError;
use crate::models::scan::{ScanConfiguration, ScanFilter, ScanRecord, ScanStatus};
use super::{format_ts, now_ts, parse_opt_ts, parse_ts, Database};

const SCAN_COLUMNS: &str = "id, name, target, scan_type, status, progress, configuration, error_message, created_at, started_at, completed_at";

/// Raw column values, converted to a `ScanRecord` outside the row closure.
struct ScanRow {
    id: String,
    name: String,
    target: String,
    scan_type: String,
    status: String,
    progress: i64,
    configuration: String,
    error_message: Option<String>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl ScanRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            target: row.get(2)?,
            scan_type: row.get(3)?,
            status: row.get(4)?,
            progress: row.get(5)?,
            configuration: row.get(6)?,
            error_message: row.get(7)?,
            created_at: row.get(8)?,
            started_at: row.get(9)?,
            completed_at: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<ScanRecord, ScanhiveError> {
        let configuration = ScanConfiguration::from_value(serde_json::from_str(&self.configuration)?)?;
        Ok(ScanRecord {
            scan_type: self.scan_type.parse()?,
            status: self.status.parse()?,
            progress: self.progress.clamp(0, 100) as u8,
            created_at: parse_ts(&self.created_at),
            started_at: parse_opt_ts(self.started_at),
            completed_at: parse_opt_ts(self.completed_at),
            id: self.id,
            name: self.name,
            target: self.target,
            error_message: self.error_message,
            configuration,
        })
    }
}

impl Database {
    pub fn insert_scan(&self, record: &ScanRecord) -> Result<(), ScanhiveError> {
        let configuration = serde_json::to_string(&record.configuration)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scans (id, name, target, scan_type, status, progress, configuration, error_message, created_at, started_at, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                record.id,
                record.name,
                record.target,
                record.scan_type.as_str(),
                record.status.as_str(),
                record.progress as i64,
                configuration,
                record.error_message,
                format_ts(&record.created_at),
                record.started_at.as_ref().map(format_ts),
                record.completed_at.as_ref().map(format_ts),
            ],
        ).map_err(|e| ScanhiveError::Database(format!("Failed to create scan: {}", e)))?;
        Ok(())
    }

    pub fn select_scan(&self, id: &str) -> Result<Option<ScanRecord>, ScanhiveError> {
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                &format!("SELECT {} FROM scans WHERE id = ?1", SCAN_COLUMNS),
                rusqlite::params![id],
                ScanRow::from_row,
            )
            .optional()
            .map_err(|e| ScanhiveError::Database(format!("Query error: {}", e)))?
        };
        row.map(ScanRow::into_record).transpose()
    }

    /// Newest first, optionally filtered by type and status.
    pub fn select_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, ScanhiveError> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM scans WHERE (?1 IS NULL OR scan_type = ?1) AND (?2 IS NULL OR status = ?2) ORDER BY created_at DESC, rowid DESC LIMIT ?3",
                SCAN_COLUMNS
            )).map_err(|e| ScanhiveError::Database(format!("Query failed: {}", e)))?;

            let mapped = stmt.query_map(
                rusqlite::params![
                    filter.scan_type.map(|t| t.as_str()),
                    filter.status.map(|s| s.as_str()),
                    filter.limit as i64,
                ],
                ScanRow::from_row,
            ).map_err(|e| ScanhiveError::Database(format!("Query error: {}", e)))?;

            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row.map_err(|e| ScanhiveError::Database(format!("Row error: {}", e)))?);
            }
            rows
        };
        rows.into_iter().map(ScanRow::into_record).collect()
    }

    /// Guarded status write. Returns whether the update was applied.
    ///
    /// The row only changes when its stored status may legally move to
    /// `status`, so terminal records are never modified. Progress is written
    /// as the max of stored and requested.
    pub fn update_scan_status(
        &self,
        id: &str,
        status: ScanStatus,
        progress: Option<u8>,
        error: Option<&str>,
    ) -> Result<bool, ScanhiveError> {
        let allowed: Vec<String> = ScanStatus::predecessors_of(status)
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect();
        if allowed.is_empty() {
            return Ok(false);
        }

        let progress = progress.map(|p| p.min(100) as i64);
        let sql = format!(
            "UPDATE scans SET
                status = ?2,
                progress = CASE WHEN ?3 IS NULL THEN progress ELSE MAX(progress, ?3) END,
                error_message = COALESCE(?4, error_message),
                started_at = CASE WHEN ?2 = 'running' THEN COALESCE(started_at, ?5) ELSE started_at END,
                completed_at = CASE WHEN ?6 THEN ?5 ELSE completed_at END
             WHERE id = ?1 AND status IN ({})",
            allowed.join(", ")
        );

        let conn = self.lock()?;
        let affected = conn.execute(
            &sql,
            rusqlite::params![id, status.as_str(), progress, error, now_ts(), status.is_terminal()],
        ).map_err(|e| ScanhiveError::Database(format!("Update failed: {}", e)))?;
        Ok(affected > 0)
    }

    pub fn remove_scan(&self, id: &str) -> Result<bool, ScanhiveError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM scans WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| ScanhiveError::Database(format!("Delete failed: {}", e)))?;
        Ok(affected > 0)
    }
}
