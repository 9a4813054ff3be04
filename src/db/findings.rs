use crate::errors::ScanhiveError;
use crate::models::finding::{Finding, Severity, SeverityCounts};
use super::{format_ts, parse_ts, Database};

impl Database {
    pub fn insert_finding(&self, finding: &Finding) -> Result<(), ScanhiveError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO findings (id, scan_id, source, severity, title, description, location, evidence, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                finding.id,
                finding.scan_id,
                finding.source,
                finding.severity.as_str(),
                finding.title,
                finding.description,
                finding.location,
                finding.evidence,
                format_ts(&finding.created_at),
            ],
        ).map_err(|e| ScanhiveError::Database(format!("Failed to insert finding: {}", e)))?;
        Ok(())
    }

    /// Findings for a scan, most severe first, then in insertion order.
    pub fn select_findings(&self, scan_id: &str) -> Result<Vec<Finding>, ScanhiveError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, scan_id, source, severity, title, description, location, evidence, created_at FROM findings WHERE scan_id = ?1 ORDER BY CASE severity WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 WHEN 'low' THEN 3 WHEN 'info' THEN 4 ELSE 5 END, rowid"
        ).map_err(|e| ScanhiveError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![scan_id], |row: &rusqlite::Row| {
            let severity: String = row.get(3)?;
            let created_at: String = row.get(8)?;
            Ok(Finding {
                id: row.get(0)?,
                scan_id: row.get(1)?,
                source: row.get(2)?,
                severity: severity.parse().unwrap_or(Severity::Info),
                title: row.get(4)?,
                description: row.get(5)?,
                location: row.get(6)?,
                evidence: row.get(7)?,
                created_at: parse_ts(&created_at),
            })
        }).map_err(|e| ScanhiveError::Database(format!("Query error: {}", e)))?;

        let mut findings = Vec::new();
        for row in rows {
            findings.push(row.map_err(|e| ScanhiveError::Database(format!("Row error: {}", e)))?);
        }
        Ok(findings)
    }

    pub fn count_findings(&self, scan_id: &str) -> Result<SeverityCounts, ScanhiveError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT severity, COUNT(*) FROM findings WHERE scan_id = ?1 GROUP BY severity"
        ).map_err(|e| ScanhiveError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![scan_id], |row: &rusqlite::Row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        }).map_err(|e| ScanhiveError::Database(format!("Query error: {}", e)))?;

        let mut counts = SeverityCounts::default();
        for row in rows {
            let (severity, count) = row.map_err(|e| ScanhiveError::Database(format!("Row error: {}", e)))?;
            counts.add(severity.parse().unwrap_or(Severity::Info), count.max(0) as u64);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finding::NewFinding;
    use crate::models::scan::{ScanConfiguration, ScanRecord, ScanType};

    fn seeded() -> (Database, String) {
        let db = Database::in_memory().unwrap();
        let record = ScanRecord::new_pending("", "example.com", ScanType::Vuln, ScanConfiguration::new());
        db.insert_scan(&record).unwrap();
        (db, record.id)
    }

    #[test]
    fn test_findings_sorted_by_severity() {
        let (db, scan_id) = seeded();
        for (sev, title) in [
            (Severity::Low, "low one"),
            (Severity::Critical, "crit"),
            (Severity::Info, "info"),
            (Severity::High, "high"),
        ] {
            db.insert_finding(&Finding::from_new(&scan_id, NewFinding::new("nuclei", sev, title))).unwrap();
        }

        let findings = db.select_findings(&scan_id).unwrap();
        let titles: Vec<&str> = findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["crit", "high", "low one", "info"]);
    }

    #[test]
    fn test_finding_requires_existing_scan() {
        let db = Database::in_memory().unwrap();
        let orphan = Finding::from_new("missing", NewFinding::new("nmap", Severity::Info, "x"));
        assert!(db.insert_finding(&orphan).is_err());
    }

    #[test]
    fn test_count_findings() {
        let (db, scan_id) = seeded();
        for sev in [Severity::High, Severity::High, Severity::Info] {
            db.insert_finding(&Finding::from_new(&scan_id, NewFinding::new("nuclei", sev, "t"))).unwrap();
        }
        let counts = db.count_findings(&scan_id).unwrap();
        assert_eq!(counts.high, 2);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_delete_scan_cascades_to_findings() {
        let (db, scan_id) = seeded();
        db.insert_finding(&Finding::from_new(&scan_id, NewFinding::new("nmap", Severity::Info, "open"))).unwrap();
        db.remove_scan(&scan_id).unwrap();
        assert!(db.select_findings(&scan_id).unwrap().is_empty());
    }
}
