use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ScanhiveError;

/// Severity level for a finding, ordered so that `Critical > High > ... > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Returns a numeric rank where lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Info => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    /// Lenient mapping for severity strings reported by tools.
    /// Anything unrecognised becomes `Info`.
    pub fn from_tool(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "critical" | "crit" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" | "med" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank().cmp(&self.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ScanhiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .iter()
            .copied()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| ScanhiveError::Validation(format!("Unknown severity '{}'", s)))
    }
}

/// A finding as emitted by an adapter, before it is attached to a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFinding {
    /// Tool that produced the finding.
    pub source: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// Host, URL, port or record the finding refers to.
    pub location: String,
    /// Raw output the finding was parsed from.
    pub evidence: String,
}

impl NewFinding {
    pub fn new(source: &str, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            severity,
            title: title.into(),
            description: String::new(),
            location: String::new(),
            evidence: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }
}

/// A persisted finding belonging to exactly one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub scan_id: String,
    pub source: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: String,
    pub evidence: String,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    pub fn from_new(scan_id: &str, new: NewFinding) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scan_id: scan_id.to_string(),
            source: new.source,
            severity: new.severity,
            title: new.title,
            description: new.description,
            location: new.location,
            evidence: new.evidence,
            created_at: Utc::now(),
        }
    }
}

/// Per-severity finding totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub info: u64,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity, count: u64) {
        match severity {
            Severity::Critical => self.critical += count,
            Severity::High => self.high += count,
            Severity::Medium => self.medium += count,
            Severity::Low => self.low += count,
            Severity::Info => self.info += count,
        }
    }

    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low + self.info
    }

    pub fn highest(&self) -> Option<Severity> {
        Severity::ALL.iter().copied().find(|s| self.get(*s) > 0)
    }
}
