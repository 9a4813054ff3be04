use std::path::Path;
use crate::errors::ScanhiveError;
use crate::models::scan::ScanType;
use super::types::{DatabaseConfig, EngineConfig, ToolsConfig};
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

/// Environment variables that override tool paths, by tool name.
pub const TOOL_PATH_ENV: &[(&str, &str)] = &[
    ("nmap", "NMAP_PATH"),
    ("masscan", "MASSCAN_PATH"),
    ("nuclei", "NUCLEI_PATH"),
    ("subfinder", "SUBFINDER_PATH"),
    ("ffuf", "FFUF_PATH"),
    ("dig", "DIG_PATH"),
];

pub async fn parse_config(path: &Path) -> Result<EngineConfig, ScanhiveError> {
    if !path.exists() {
        return Err(ScanhiveError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ScanhiveError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<EngineConfig, ScanhiveError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(EngineConfig::default());
    }

    // Security pattern validation
    validate_security_patterns(&yaml)?;

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: EngineConfig = serde_yaml::from_value(yaml)?;

    // Semantic conflict detection
    validate_conflicts(&config)?;

    Ok(config)
}

/// Load the config file when given, then apply environment overrides.
pub async fn load_config(path: Option<&Path>) -> Result<EngineConfig, ScanhiveError> {
    let mut config = match path {
        Some(path) => parse_config(path).await?,
        None => EngineConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Environment values win over the file.
pub fn apply_env_overrides<F>(config: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(path) = lookup("SCANHIVE_DB") {
        config.database.get_or_insert_with(DatabaseConfig::default).path = Some(path);
    }

    for (tool, var) in TOOL_PATH_ENV {
        if let Some(path) = lookup(*var) {
            let tools = config.tools.get_or_insert_with(ToolsConfig::default);
            let slot = match *tool {
                "nmap" => &mut tools.nmap,
                "masscan" => &mut tools.masscan,
                "nuclei" => &mut tools.nuclei,
                "subfinder" => &mut tools.subfinder,
                "ffuf" => &mut tools.ffuf,
                _ => &mut tools.dig,
            };
            *slot = Some(path);
        }
    }

    if let Some(wordlist) = lookup("FFUF_WORDLIST") {
        config.tools.get_or_insert_with(ToolsConfig::default).ffuf_wordlist = Some(wordlist);
    }
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ScanhiveError> {
    let json_value: serde_json::Value = serde_yaml::from_value(yaml.clone())
        .map_err(|e| ScanhiveError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ScanhiveError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory only; typed parsing and conflict checks are authoritative
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &EngineConfig) -> Result<(), ScanhiveError> {
    let Some(scans) = &config.scans else {
        return Ok(());
    };

    if let Some(timeouts) = &scans.timeouts {
        for (key, secs) in timeouts {
            key.parse::<ScanType>()
                .map_err(|_| ScanhiveError::Config(format!("Unknown scan type '{}' in scans.timeouts", key)))?;
            if *secs == 0 {
                return Err(ScanhiveError::Config(format!("Timeout for '{}' must be greater than zero", key)));
            }
        }
    }

    if let Some(defaults) = &scans.defaults {
        for (key, value) in defaults {
            key.parse::<ScanType>()
                .map_err(|_| ScanhiveError::Config(format!("Unknown scan type '{}' in scans.defaults", key)))?;
            if !value.is_object() {
                return Err(ScanhiveError::Config(format!("scans.defaults.{} must be a mapping", key)));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config_str(
            "database:\n  path: /var/lib/scanhive/scans.db\ntools:\n  nmap: /opt/nmap/bin/nmap\n  ffuf_wordlist: /usr/share/wordlists/common.txt\nscans:\n  timeouts:\n    vuln: 120\n",
        )
        .unwrap();
        assert_eq!(config.database_path(), "/var/lib/scanhive/scans.db");
        assert_eq!(config.tool_path("nmap"), Some("/opt/nmap/bin/nmap"));
        assert_eq!(config.ffuf_wordlist(), Some("/usr/share/wordlists/common.txt"));
        assert_eq!(config.timeout_for(ScanType::Vuln), Duration::from_secs(120));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.database_path(), "scanhive.db");
    }

    #[test]
    fn test_unknown_scan_type_timeout_rejected() {
        let err = parse_config_str("scans:\n  timeouts:\n    nessus: 10\n").unwrap_err();
        assert!(matches!(err, ScanhiveError::Config(_)));
        assert!(err.to_string().contains("nessus"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(parse_config_str("scans:\n  timeouts:\n    dns: 0\n").is_err());
    }

    #[test]
    fn test_non_mapping_defaults_rejected() {
        assert!(parse_config_str("scans:\n  defaults:\n    masscan: fast\n").is_err());
    }

    #[test]
    fn test_dangerous_value_rejected() {
        assert!(parse_config_str("tools:\n  nmap: '$(id)'\n").is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = parse_config_str("tools:\n  nmap: /usr/bin/nmap\n").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("NMAP_PATH", "/custom/nmap"),
            ("DIG_PATH", "/custom/dig"),
            ("SCANHIVE_DB", "/tmp/alt.db"),
            ("FFUF_WORDLIST", "/tmp/words.txt"),
            ("NUCLEI_PATH", "  "),
        ]);
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.tool_path("nmap"), Some("/custom/nmap"));
        assert_eq!(config.tool_path("dig"), Some("/custom/dig"));
        assert_eq!(config.tool_path("nuclei"), None);
        assert_eq!(config.database_path(), "/tmp/alt.db");
        assert_eq!(config.ffuf_wordlist(), Some("/tmp/words.txt"));
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let err = parse_config(Path::new("/nonexistent/scanhive.yaml")).await.unwrap_err();
        assert!(matches!(err, ScanhiveError::Config(_)));
    }

    #[tokio::test]
    async fn test_parse_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanhive.yaml");
        tokio::fs::write(&path, "scans:\n  timeouts:\n    dns: 15\n").await.unwrap();
        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.timeout_for(ScanType::Dns), Duration::from_secs(15));
    }
}
