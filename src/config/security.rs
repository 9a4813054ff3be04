use crate::errors::ScanhiveError;
use crate::models::scan::ScanConfiguration;

const DANGEROUS_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "$(",
    "${",
    "`",
];

/// Screen every string in a YAML config file for path traversal and shell expansion.
pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), ScanhiveError> {
    check_value(value, &[])?;
    Ok(())
}

fn check_value(value: &serde_yaml::Value, path: &[String]) -> Result<(), ScanhiveError> {
    match value {
        serde_yaml::Value::String(s) => {
            let lower = s.to_lowercase();
            for pattern in DANGEROUS_PATTERNS {
                if lower.contains(pattern) {
                    return Err(ScanhiveError::Config(
                        format!("Dangerous pattern '{}' found at config path: {}", pattern, path_label(path))
                    ));
                }
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = k.as_str().unwrap_or("unknown").to_string();
                let mut new_path = path.to_vec();
                new_path.push(key);
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let mut new_path = path.to_vec();
                new_path.push(format!("[{}]", i));
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn path_label(path: &[String]) -> String {
    if path.is_empty() { "root".to_string() } else { path.join(".") }
}

/// Reject scan configuration values that could be read as extra tool options.
///
/// Values end up as process arguments, so a string may not start with `-`
/// or carry control characters. Nested objects are not accepted.
pub fn validate_scan_configuration(config: &ScanConfiguration) -> Result<(), ScanhiveError> {
    let value = config.as_value();
    let Some(map) = value.as_object() else {
        return Ok(());
    };
    for (key, value) in map {
        if key.starts_with('-') || key.chars().any(char::is_control) {
            return Err(ScanhiveError::Validation(format!("Unsafe configuration key '{}'", key.escape_debug())));
        }
        match value {
            serde_json::Value::String(s) => check_argument(key, s)?,
            serde_json::Value::Array(items) => {
                for item in items {
                    match item {
                        serde_json::Value::String(s) => check_argument(key, s)?,
                        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                            return Err(ScanhiveError::Validation(format!(
                                "Configuration key '{}' may only list plain values",
                                key
                            )));
                        }
                        _ => {}
                    }
                }
            }
            serde_json::Value::Object(_) => {
                return Err(ScanhiveError::Validation(format!(
                    "Configuration key '{}' must not be a nested object",
                    key
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_argument(key: &str, value: &str) -> Result<(), ScanhiveError> {
    if value.trim_start().starts_with('-') {
        return Err(ScanhiveError::Validation(format!(
            "Configuration value for '{}' must not start with '-'",
            key
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(ScanhiveError::Validation(format!(
            "Configuration value for '{}' contains control characters",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yaml(src: &str) -> serde_yaml::Value {
        serde_yaml::from_str::<serde_yaml::Value>(src).unwrap()
    }

    #[test]
    fn test_safe_config_passes() {
        let config = yaml("tools:\n  nmap: /usr/bin/nmap\nscans:\n  timeouts:\n    dns: 30");
        assert!(validate_security_patterns(&config).is_ok());
    }

    #[test]
    fn test_directory_traversal_blocked() {
        assert!(validate_security_patterns(&yaml("database:\n  path: ../../etc/passwd")).is_err());
    }

    #[test]
    fn test_command_substitution_blocked() {
        let err = validate_security_patterns(&yaml("tools:\n  nmap: '$(curl evil)'")).unwrap_err();
        assert!(err.to_string().contains("tools.nmap"));
    }

    #[test]
    fn test_array_dangerous_pattern_blocked() {
        assert!(validate_security_patterns(&yaml("items:\n  - '`id`'")).is_err());
    }

    #[test]
    fn test_numeric_values_pass() {
        assert!(validate_security_patterns(&yaml("port: 8080\nenabled: true")).is_ok());
    }

    #[test]
    fn test_scan_configuration_accepts_plain_values() {
        let config = ScanConfiguration::from_value(json!({
            "ports": "22,80,443",
            "rate": 1000,
            "severity": ["high", "critical"],
            "timeout_secs": 60,
        }))
        .unwrap();
        assert!(validate_scan_configuration(&config).is_ok());
    }

    #[test]
    fn test_scan_configuration_rejects_option_injection() {
        let config = ScanConfiguration::new().with("ports", "-oN /tmp/out");
        let err = validate_scan_configuration(&config).unwrap_err();
        assert!(matches!(err, ScanhiveError::Validation(_)));

        let in_list = ScanConfiguration::new().with("tags", json!(["cve", "--update"]));
        assert!(validate_scan_configuration(&in_list).is_err());
    }

    #[test]
    fn test_scan_configuration_rejects_control_characters() {
        let config = ScanConfiguration::new().with("ports", "80\n443");
        assert!(validate_scan_configuration(&config).is_err());
    }

    #[test]
    fn test_scan_configuration_rejects_nested_objects() {
        let config = ScanConfiguration::new().with("nmap", json!({"args": "x"}));
        assert!(validate_scan_configuration(&config).is_err());
    }
}
