use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ScanhiveError;

/// Lifecycle state of a scan. `Pending` is initial; the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanStatus {
    pub const ALL: [ScanStatus; 5] = [
        ScanStatus::Pending,
        ScanStatus::Running,
        ScanStatus::Completed,
        ScanStatus::Failed,
        ScanStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// The only legal moves are pending -> running and running -> terminal.
    /// Running -> running is allowed so progress updates can be written.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Running, Self::Running) => true,
            (Self::Running, n) => n.is_terminal(),
            _ => false,
        }
    }

    /// Every status that may legally move to `next`.
    pub fn predecessors_of(next: ScanStatus) -> Vec<ScanStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = ScanhiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ScanhiveError::Validation(format!("Unknown scan status '{}'", s)))
    }
}

/// Fixed set of scan types. Each maps to one adapter or one phase sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    Quick,
    Service,
    Masscan,
    Dns,
    Subdomain,
    Vuln,
    WebFuzz,
    FullRecon,
    FullWeb,
}

impl ScanType {
    pub const ALL: [ScanType; 9] = [
        ScanType::Quick,
        ScanType::Service,
        ScanType::Masscan,
        ScanType::Dns,
        ScanType::Subdomain,
        ScanType::Vuln,
        ScanType::WebFuzz,
        ScanType::FullRecon,
        ScanType::FullWeb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Service => "service",
            Self::Masscan => "masscan",
            Self::Dns => "dns",
            Self::Subdomain => "subdomain",
            Self::Vuln => "vuln",
            Self::WebFuzz => "web_fuzz",
            Self::FullRecon => "full_recon",
            Self::FullWeb => "full_web",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Quick => "Fast nmap scan of the most common ports",
            Self::Service => "nmap service and version detection",
            Self::Masscan => "High-rate masscan port sweep",
            Self::Dns => "DNS record lookup with dig",
            Self::Subdomain => "Passive subdomain enumeration with subfinder",
            Self::Vuln => "nuclei template-based vulnerability scan",
            Self::WebFuzz => "ffuf content discovery",
            Self::FullRecon => "Subdomains, DNS, services and vulnerabilities in sequence",
            Self::FullWeb => "nuclei followed by ffuf content discovery",
        }
    }

    /// Built-in execution time limit, overridable from configuration.
    pub fn default_timeout(&self) -> Duration {
        let secs = match self {
            Self::Dns => 30,
            Self::Quick | Self::Subdomain => 10 * 60,
            Self::Service | Self::Masscan | Self::WebFuzz => 30 * 60,
            Self::Vuln => 60 * 60,
            Self::FullWeb => 90 * 60,
            Self::FullRecon => 120 * 60,
        };
        Duration::from_secs(secs)
    }

    /// Whether this type runs several tools through the phase sequencer.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::FullRecon | Self::FullWeb)
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = ScanhiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                ScanhiveError::Validation(format!(
                    "Unknown scan type '{}'. Valid types: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Opaque per-scan settings handed to adapters. Always a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanConfiguration(Map<String, Value>);

impl ScanConfiguration {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_value(value: Value) -> Result<Self, ScanhiveError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(ScanhiveError::Validation(format!(
                "Scan configuration must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Accepts either a JSON number or a numeric string.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Accepts either an array of strings or a comma-separated string.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Per-scan override of the scan type's timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.get_u64("timeout_secs")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// The persisted unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub name: String,
    pub target: String,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub configuration: ScanConfiguration,
}

impl ScanRecord {
    pub fn new_pending(
        name: &str,
        target: &str,
        scan_type: ScanType,
        configuration: ScanConfiguration,
    ) -> Self {
        let name = if name.trim().is_empty() {
            format!("{} - {}", scan_type, target)
        } else {
            name.trim().to_string()
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            target: target.to_string(),
            scan_type,
            status: ScanStatus::Pending,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            configuration,
        }
    }
}

/// Inbound CreateScan payload. `scan_type` stays a string until validated.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateScanRequest {
    #[serde(default)]
    pub name: String,
    pub target: String,
    pub scan_type: String,
    #[serde(default)]
    pub configuration: Value,
}

#[derive(Debug, Clone)]
pub struct ScanFilter {
    pub scan_type: Option<ScanType>,
    pub status: Option<ScanStatus>,
    pub limit: usize,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            scan_type: None,
            status: None,
            limit: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_follow_lifecycle() {
        assert!(ScanStatus::Pending.can_transition_to(ScanStatus::Running));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Completed));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Failed));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Cancelled));
    }

    #[test]
    fn test_status_rejects_skipping_running() {
        assert!(!ScanStatus::Pending.can_transition_to(ScanStatus::Completed));
        assert!(!ScanStatus::Pending.can_transition_to(ScanStatus::Cancelled));
    }

    #[test]
    fn test_terminal_status_is_final() {
        for terminal in [ScanStatus::Completed, ScanStatus::Failed, ScanStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in ScanStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_predecessors_of_terminal_is_running_only() {
        assert_eq!(ScanStatus::predecessors_of(ScanStatus::Failed), vec![ScanStatus::Running]);
        assert_eq!(
            ScanStatus::predecessors_of(ScanStatus::Running),
            vec![ScanStatus::Pending, ScanStatus::Running]
        );
        assert!(ScanStatus::predecessors_of(ScanStatus::Pending).is_empty());
    }

    #[test]
    fn test_scan_type_from_str() {
        assert_eq!("quick".parse::<ScanType>().unwrap(), ScanType::Quick);
        assert_eq!(" Web_Fuzz ".parse::<ScanType>().unwrap(), ScanType::WebFuzz);
        let err = "nessus".parse::<ScanType>().unwrap_err();
        assert!(matches!(err, ScanhiveError::Validation(_)));
        assert!(err.to_string().contains("full_recon"));
    }

    #[test]
    fn test_scan_type_serde_matches_as_str() {
        for t in ScanType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn test_dns_timeout_is_shorter_than_full_recon() {
        assert!(ScanType::Dns.default_timeout() < ScanType::Quick.default_timeout());
        assert!(ScanType::Vuln.default_timeout() < ScanType::FullRecon.default_timeout());
    }

    #[test]
    fn test_configuration_rejects_non_object() {
        assert!(ScanConfiguration::from_value(serde_json::json!([1, 2])).is_err());
        assert!(ScanConfiguration::from_value(Value::Null).unwrap().as_value().is_object());
    }

    #[test]
    fn test_configuration_accessors() {
        let config = ScanConfiguration::from_value(serde_json::json!({
            "ports": "80,443",
            "rate": "5000",
            "timeout_secs": 12,
            "severity": ["high", "critical"],
            "tags": "cve, rce",
        }))
        .unwrap();
        assert_eq!(config.get_str("ports"), Some("80,443"));
        assert_eq!(config.get_u64("rate"), Some(5000));
        assert_eq!(config.timeout(), Some(Duration::from_secs(12)));
        assert_eq!(config.get_list("severity"), vec!["high", "critical"]);
        assert_eq!(config.get_list("tags"), vec!["cve", "rce"]);
        assert!(config.get_list("missing").is_empty());
    }

    #[test]
    fn test_new_pending_defaults_name() {
        let record = ScanRecord::new_pending("", "example.com", ScanType::Dns, ScanConfiguration::new());
        assert_eq!(record.name, "dns - example.com");
        assert_eq!(record.status, ScanStatus::Pending);
        assert_eq!(record.progress, 0);
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
    }
}
