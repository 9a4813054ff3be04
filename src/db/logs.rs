use crate::errors::ScanhiveError;
use crate::models::log_entry::{LogEntry, LogLevel};
use super::{now_ts, parse_ts, Database};

impl Database {
    /// Append one log line; returns the assigned sequence number.
    pub fn insert_log(&self, scan_id: &str, level: LogLevel, message: &str) -> Result<i64, ScanhiveError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scan_logs (scan_id, level, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![scan_id, level.as_str(), message, now_ts()],
        ).map_err(|e| ScanhiveError::Database(format!("Failed to append log: {}", e)))?;
        Ok(conn.last_insert_rowid())
    }

    /// Log lines in production order. `tail` keeps only the last N.
    pub fn select_logs(&self, scan_id: &str, tail: Option<usize>) -> Result<Vec<LogEntry>, ScanhiveError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT seq, scan_id, level, message, created_at FROM (
                SELECT * FROM scan_logs WHERE scan_id = ?1 ORDER BY seq DESC LIMIT ?2
             ) ORDER BY seq ASC"
        ).map_err(|e| ScanhiveError::Database(format!("Query failed: {}", e)))?;

        // LIMIT -1 means no limit in SQLite
        let limit = tail.map(|n| n as i64).unwrap_or(-1);
        let rows = stmt.query_map(rusqlite::params![scan_id, limit], |row: &rusqlite::Row| {
            let level: String = row.get(2)?;
            let created_at: String = row.get(4)?;
            Ok(LogEntry {
                seq: row.get(0)?,
                scan_id: row.get(1)?,
                level: level.parse().unwrap_or(LogLevel::Info),
                message: row.get(3)?,
                created_at: parse_ts(&created_at),
            })
        }).map_err(|e| ScanhiveError::Database(format!("Query error: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| ScanhiveError::Database(format!("Row error: {}", e)))?);
        }
        Ok(entries)
    }
}
