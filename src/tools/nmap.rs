use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

// port/state/protocol/owner/service/rpc/version/
static PORT_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)/([a-z|]+)/(\w+)/[^/]*/([^/]*)/[^/]*/([^/]*)/").expect("valid port regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmapProfile {
    /// Top 100 ports, aggressive timing.
    Fast,
    /// Service and version detection.
    Service,
}

impl NmapProfile {
    fn args(&self, explicit_ports: bool) -> Vec<&'static str> {
        match self {
            // -F and -p are mutually exclusive
            NmapProfile::Fast if explicit_ports => vec!["-T4"],
            NmapProfile::Fast => vec!["-T4", "-F"],
            NmapProfile::Service => vec!["-sV", "-T4"],
        }
    }
}

pub struct NmapAdapter {
    program: String,
    profile: NmapProfile,
}

impl NmapAdapter {
    pub fn new(program: Option<&str>, profile: NmapProfile) -> Self {
        Self {
            program: program.unwrap_or("nmap").to_string(),
            profile,
        }
    }
}

impl ToolAdapter for NmapAdapter {
    fn name(&self) -> &str {
        "nmap"
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn build_invocation(&self, target: &Target, config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let ports = config
            .get_str("ports")
            .map(str::to_string)
            .or_else(|| target.port.map(|p| p.to_string()));

        let mut invocation = ToolInvocation::new(&self.program)
            .args(self.profile.args(ports.is_some()));
        if let Some(ports) = ports {
            invocation = invocation.arg("-p").arg(ports);
        }
        Ok(invocation.args(["-oG", "-"]).arg(&target.host))
    }

    fn parse_line(&self, line: &str, _target: &Target) -> ParsedLine {
        parse_greppable(line)
    }
}

fn parse_greppable(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return ParsedLine::Ignored;
    }
    let Some(rest) = line.strip_prefix("Host:") else {
        return ParsedLine::Unparseable;
    };

    let mut fields = rest.split('\t');
    let host_field = fields.next().unwrap_or_default().trim();
    let address = host_field.split_whitespace().next().unwrap_or_default();
    if address.is_empty() {
        return ParsedLine::Unparseable;
    }
    let hostname = host_field
        .split_once('(')
        .and_then(|(_, h)| h.strip_suffix(')'))
        .filter(|h| !h.is_empty());

    let Some(ports) = fields.find_map(|f| f.trim().strip_prefix("Ports:")) else {
        // Status lines carry no ports
        return ParsedLine::Records(Vec::new());
    };

    let findings = PORT_ENTRY
        .captures_iter(ports)
        .filter(|cap| &cap[2] == "open")
        .map(|cap| {
            let (port, proto, service, version) = (&cap[1], &cap[3], &cap[4], &cap[5]);
            let title = if service.is_empty() {
                format!("Open port {}/{}", port, proto)
            } else {
                format!("Open port {}/{} ({})", port, proto, service)
            };
            let mut description = String::new();
            if !version.is_empty() {
                description.push_str(version);
            }
            if let Some(name) = hostname {
                if !description.is_empty() {
                    description.push_str("; ");
                }
                description.push_str(&format!("hostname {}", name));
            }
            NewFinding::new("nmap", Severity::Info, title)
                .location(format!("{}:{}/{}", address, port, proto))
                .description(description)
                .evidence(line)
        })
        .collect();
    ParsedLine::Records(findings)
}
