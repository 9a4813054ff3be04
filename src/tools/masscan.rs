use serde::Deserialize;

use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

const DEFAULT_PORTS: &str = "1-65535";
const DEFAULT_RATE: u64 = 10_000;

#[derive(Debug, Deserialize)]
struct MasscanRecord {
    ip: String,
    #[serde(default)]
    ports: Vec<MasscanPort>,
}

#[derive(Debug, Deserialize)]
struct MasscanPort {
    port: u16,
    #[serde(default = "default_proto")]
    proto: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    ttl: Option<u32>,
}

fn default_proto() -> String {
    "tcp".to_string()
}

pub struct MasscanAdapter {
    program: String,
}

impl MasscanAdapter {
    pub fn new(program: Option<&str>) -> Self {
        Self {
            program: program.unwrap_or("masscan").to_string(),
        }
    }
}

impl ToolAdapter for MasscanAdapter {
    fn name(&self) -> &str {
        "masscan"
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn build_invocation(&self, target: &Target, config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let ports = config.get_str("ports").unwrap_or(DEFAULT_PORTS);
        let rate = config.get_u64("rate").unwrap_or(DEFAULT_RATE);
        if rate == 0 {
            return Err(ScanhiveError::Validation("masscan rate must be greater than zero".into()));
        }
        Ok(ToolInvocation::new(&self.program)
            .arg(&target.host)
            .args(["-p", ports])
            .arg("--rate")
            .arg(rate.to_string())
            .args(["-oJ", "-", "--open"]))
    }

    fn parse_line(&self, line: &str, _target: &Target) -> ParsedLine {
        parse_record(line)
    }
}

/// masscan writes a JSON array one element per line, with separators
/// either trailing or leading depending on version.
fn parse_record(line: &str) -> ParsedLine {
    let trimmed = line.trim().trim_start_matches(',').trim_end_matches(',').trim();
    if trimmed.is_empty() || trimmed == "[" || trimmed == "]" {
        return ParsedLine::Ignored;
    }
    let Ok(record) = serde_json::from_str::<MasscanRecord>(trimmed) else {
        return ParsedLine::Unparseable;
    };

    let findings = record
        .ports
        .iter()
        .filter(|p| p.status.is_empty() || p.status == "open")
        .map(|p| {
            let mut finding = NewFinding::new("masscan", Severity::Info, format!("Open port {}/{}", p.port, p.proto))
                .location(format!("{}:{}/{}", record.ip, p.port, p.proto))
                .evidence(trimmed);
            if let Some(ttl) = p.ttl {
                finding = finding.description(format!("ttl {}", ttl));
            }
            finding
        })
        .collect();
    ParsedLine::Records(findings)
}
