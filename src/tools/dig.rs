use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

pub const DEFAULT_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "MX", "NS", "TXT", "SOA"];

const DNS_CLASSES: &[&str] = &["IN", "CH", "HS", "ANY"];

pub struct DigAdapter {
    program: String,
}

impl DigAdapter {
    pub fn new(program: Option<&str>) -> Self {
        Self {
            program: program.unwrap_or("dig").to_string(),
        }
    }
}

impl ToolAdapter for DigAdapter {
    fn name(&self) -> &str {
        "dig"
    }

    fn program(&self) -> &str {
        &self.program
    }

    /// One query per record type, each naming the host again so dig treats
    /// them as separate questions.
    fn build_invocation(&self, target: &Target, config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let requested = config.get_list("record_types");
        let types: Vec<String> = if requested.is_empty() {
            DEFAULT_RECORD_TYPES.iter().map(|t| t.to_string()).collect()
        } else {
            requested.iter().map(|t| t.to_uppercase()).collect()
        };
        if let Some(bad) = types.iter().find(|t| !t.chars().all(|c| c.is_ascii_alphanumeric())) {
            return Err(ScanhiveError::Validation(format!("Invalid DNS record type '{}'", bad)));
        }

        let mut invocation = ToolInvocation::new(&self.program)
            .args(["+noall", "+answer"]);
        if let Some(server) = config.get_str("resolver") {
            invocation = invocation.arg(format!("@{}", server));
        }
        for record_type in types {
            invocation = invocation.arg(&target.host).arg(record_type);
        }
        Ok(invocation)
    }

    fn parse_line(&self, line: &str, _target: &Target) -> ParsedLine {
        parse_answer(line)
    }
}

/// `name ttl class type rdata...`
fn parse_answer(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') {
        return ParsedLine::Ignored;
    }
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < 5 || fields[1].parse::<u32>().is_err() || !DNS_CLASSES.contains(&fields[2]) {
        return ParsedLine::Unparseable;
    }

    let name = fields[0].trim_end_matches('.');
    let record_type = fields[3];
    let data = fields[4..].join(" ");
    ParsedLine::Records(vec![NewFinding::new(
        "dig",
        Severity::Info,
        format!("{} record for {}: {}", record_type, name, data),
    )
    .location(name)
    .description(format!("ttl {}", fields[1]))
    .evidence(trimmed)])
}
