use serde::Deserialize;

use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

#[derive(Debug, Deserialize)]
struct SubfinderRecord {
    host: String,
    #[serde(default)]
    source: String,
}

pub struct SubfinderAdapter {
    program: String,
}

impl SubfinderAdapter {
    pub fn new(program: Option<&str>) -> Self {
        Self {
            program: program.unwrap_or("subfinder").to_string(),
        }
    }
}

impl ToolAdapter for SubfinderAdapter {
    fn name(&self) -> &str {
        "subfinder"
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn build_invocation(&self, target: &Target, config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let mut invocation = ToolInvocation::new(&self.program)
            .arg("-d")
            .arg(&target.host)
            .args(["-silent", "-oJ"]);
        let sources = config.get_list("sources");
        if !sources.is_empty() {
            invocation = invocation.arg("-s").arg(sources.join(","));
        }
        Ok(invocation)
    }

    fn parse_line(&self, line: &str, _target: &Target) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Ignored;
        }
        match serde_json::from_str::<SubfinderRecord>(line) {
            Ok(record) if !record.host.is_empty() => {
                let mut finding = NewFinding::new(
                    "subfinder",
                    Severity::Info,
                    format!("Subdomain discovered: {}", record.host),
                )
                .location(&record.host)
                .evidence(line);
                if !record.source.is_empty() {
                    finding = finding.description(format!("source: {}", record.source));
                }
                ParsedLine::Records(vec![finding])
            }
            _ => ParsedLine::Unparseable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subdomain() {
        let adapter = SubfinderAdapter::new(None);
        let target = Target::parse("example.com").unwrap();
        let line = r#"{"host":"api.example.com","input":"example.com","source":"crtsh"}"#;
        let ParsedLine::Records(findings) = adapter.parse_line(line, &target) else {
            panic!("expected records");
        };
        assert_eq!(findings[0].location, "api.example.com");
        assert_eq!(findings[0].description, "source: crtsh");
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_plain_hostname_line_is_unparseable() {
        let adapter = SubfinderAdapter::new(None);
        let target = Target::parse("example.com").unwrap();
        assert_eq!(adapter.parse_line("api.example.com", &target), ParsedLine::Unparseable);
    }

    #[test]
    fn test_invocation_uses_bare_host() {
        let adapter = SubfinderAdapter::new(Some("/usr/local/bin/subfinder"));
        let target = Target::parse("https://www.example.com/login").unwrap();
        let inv = adapter.build_invocation(&target, &ScanConfiguration::new()).unwrap();
        assert_eq!(inv.args, vec!["-d", "www.example.com", "-silent", "-oJ"]);
    }
}
