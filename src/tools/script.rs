use serde::Deserialize;

use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

#[derive(Debug, Deserialize)]
struct ScriptRecord {
    title: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
}

/// Runs any program that already prints normalized JSON lines.
///
/// Arguments may contain `{target}`, `{host}` and `{url}` placeholders.
pub struct ScriptAdapter {
    name: String,
    program: String,
    args: Vec<String>,
}

impl ScriptAdapter {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `sh -c <script>`, mostly useful for wiring up ad hoc checks.
    pub fn shell(name: &str, script: &str) -> Self {
        Self::new(name, "sh", &["-c", script])
    }
}

impl ToolAdapter for ScriptAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn build_invocation(&self, target: &Target, _config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let args = self.args.iter().map(|arg| {
            arg.replace("{target}", &target.raw)
                .replace("{host}", &target.host)
                .replace("{url}", &target.url)
        });
        Ok(ToolInvocation::new(&self.program).args(args))
    }

    fn parse_line(&self, line: &str, target: &Target) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Ignored;
        }
        match serde_json::from_str::<ScriptRecord>(line) {
            Ok(record) if !record.title.is_empty() => {
                let location = if record.location.is_empty() {
                    target.raw.clone()
                } else {
                    record.location
                };
                ParsedLine::Records(vec![NewFinding::new(&self.name, Severity::from_tool(&record.severity), record.title)
                    .location(location)
                    .description(record.description)
                    .evidence(line)])
            }
            _ => ParsedLine::Unparseable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_substituted() {
        let adapter = ScriptAdapter::new("healthcheck", "/usr/local/bin/healthcheck", &["--host", "{host}", "{url}/health"]);
        let target = Target::parse("example.com:8443").unwrap();
        let inv = adapter.build_invocation(&target, &ScanConfiguration::new()).unwrap();
        assert_eq!(inv.args, vec!["--host", "example.com", "http://example.com:8443/health"]);
    }

    #[test]
    fn test_parse_normalized_line() {
        let adapter = ScriptAdapter::shell("healthcheck", "true");
        let target = Target::parse("example.com").unwrap();
        let ParsedLine::Records(findings) = adapter.parse_line(
            r#"{"title":"TLS 1.0 enabled","severity":"medium","location":"example.com:443","description":"legacy protocol"}"#,
            &target,
        ) else {
            panic!("expected records");
        };
        assert_eq!(findings[0].source, "healthcheck");
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].location, "example.com:443");
    }

    #[test]
    fn test_missing_title_is_unparseable() {
        let adapter = ScriptAdapter::shell("healthcheck", "true");
        let target = Target::parse("example.com").unwrap();
        assert_eq!(adapter.parse_line(r#"{"severity":"high"}"#, &target), ParsedLine::Unparseable);
        assert_eq!(adapter.parse_line("not json", &target), ParsedLine::Unparseable);
    }
}
