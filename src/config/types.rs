use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::scan::{ScanConfiguration, ScanType};

pub const DEFAULT_DATABASE_PATH: &str = "scanhive.db";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    pub database: Option<DatabaseConfig>,
    pub tools: Option<ToolsConfig>,
    pub scans: Option<ScansConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

/// Explicit program paths. Unset tools are resolved on `PATH`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ToolsConfig {
    pub nmap: Option<String>,
    pub masscan: Option<String>,
    pub nuclei: Option<String>,
    pub subfinder: Option<String>,
    pub ffuf: Option<String>,
    pub dig: Option<String>,
    pub ffuf_wordlist: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScansConfig {
    /// Per scan type timeout in seconds, keyed by wire name.
    pub timeouts: Option<BTreeMap<String, u64>>,
    /// Per scan type configuration merged under each request's own values.
    pub defaults: Option<BTreeMap<String, serde_json::Value>>,
}

impl EngineConfig {
    pub fn database_path(&self) -> &str {
        self.database
            .as_ref()
            .and_then(|d| d.path.as_deref())
            .unwrap_or(DEFAULT_DATABASE_PATH)
    }

    pub fn tool_path(&self, tool: &str) -> Option<&str> {
        let tools = self.tools.as_ref()?;
        let path = match tool {
            "nmap" => tools.nmap.as_deref(),
            "masscan" => tools.masscan.as_deref(),
            "nuclei" => tools.nuclei.as_deref(),
            "subfinder" => tools.subfinder.as_deref(),
            "ffuf" => tools.ffuf.as_deref(),
            "dig" => tools.dig.as_deref(),
            _ => None,
        };
        path.filter(|p| !p.is_empty())
    }

    pub fn ffuf_wordlist(&self) -> Option<&str> {
        self.tools.as_ref()?.ffuf_wordlist.as_deref().filter(|p| !p.is_empty())
    }

    pub fn timeout_for(&self, scan_type: ScanType) -> Duration {
        self.scans
            .as_ref()
            .and_then(|s| s.timeouts.as_ref())
            .and_then(|t| t.get(scan_type.as_str()))
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or_else(|| scan_type.default_timeout())
    }

    /// Layer a request's configuration over the configured defaults for its type.
    pub fn merged_configuration(&self, scan_type: ScanType, request: ScanConfiguration) -> ScanConfiguration {
        let defaults = self
            .scans
            .as_ref()
            .and_then(|s| s.defaults.as_ref())
            .and_then(|d| d.get(scan_type.as_str()))
            .and_then(|v| v.as_object());

        let Some(defaults) = defaults else {
            return request;
        };
        let mut merged = ScanConfiguration::new();
        for (key, value) in defaults {
            merged = merged.with(key, value.clone());
        }
        if let serde_json::Value::Object(own) = request.as_value() {
            for (key, value) in own {
                merged = merged.with(&key, value);
            }
        }
        merged
    }
}
