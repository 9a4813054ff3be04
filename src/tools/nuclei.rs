use serde::Deserialize;

use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

#[derive(Debug, Deserialize)]
struct NucleiResult {
    #[serde(rename = "template-id", default)]
    template_id: String,
    #[serde(default)]
    info: NucleiInfo,
    #[serde(default)]
    host: String,
    #[serde(rename = "matched-at", default)]
    matched_at: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct NucleiInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    description: String,
}

pub struct NucleiAdapter {
    program: String,
}

impl NucleiAdapter {
    pub fn new(program: Option<&str>) -> Self {
        Self {
            program: program.unwrap_or("nuclei").to_string(),
        }
    }
}

impl ToolAdapter for NucleiAdapter {
    fn name(&self) -> &str {
        "nuclei"
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn build_invocation(&self, target: &Target, config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let mut invocation = ToolInvocation::new(&self.program)
            .arg("-target")
            .arg(&target.url)
            .args(["-jsonl", "-silent", "-nc"]);

        for (key, flag) in [("templates", "-t"), ("severity", "-severity"), ("tags", "-tags")] {
            let values = config.get_list(key);
            if !values.is_empty() {
                invocation = invocation.arg(flag).arg(values.join(","));
            }
        }
        Ok(invocation)
    }

    fn parse_line(&self, line: &str, target: &Target) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Ignored;
        }
        let Ok(result) = serde_json::from_str::<NucleiResult>(line) else {
            return ParsedLine::Unparseable;
        };
        if result.template_id.is_empty() && result.info.name.is_empty() {
            return ParsedLine::Unparseable;
        }

        let title = if result.info.name.is_empty() {
            result.template_id.clone()
        } else {
            result.info.name.clone()
        };
        let location = [&result.matched_at, &result.host]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| target.url.clone());

        let mut description = result.info.description.trim().to_string();
        if !result.template_id.is_empty() {
            if !description.is_empty() {
                description.push('\n');
            }
            description.push_str(&format!("template: {}", result.template_id));
            if !result.kind.is_empty() {
                description.push_str(&format!(" ({})", result.kind));
            }
        }

        ParsedLine::Records(vec![NewFinding::new("nuclei", Severity::from_tool(&result.info.severity), title)
            .location(location)
            .description(description)
            .evidence(line)])
    }
}
