use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::ScanhiveError;
use crate::models::finding::{NewFinding, Severity};
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::adapter::{ParsedLine, ToolAdapter, ToolInvocation};

pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/dirb/common.txt";

#[derive(Debug, Deserialize)]
struct FfufResult {
    #[serde(default)]
    input: HashMap<String, String>,
    status: u16,
    #[serde(default)]
    length: u64,
    #[serde(default)]
    words: u64,
    #[serde(default)]
    lines: u64,
    #[serde(default)]
    url: String,
    #[serde(rename = "redirectlocation", default)]
    redirect_location: String,
}

pub struct FfufAdapter {
    program: String,
    wordlist: String,
}

impl FfufAdapter {
    pub fn new(program: Option<&str>, wordlist: Option<&str>) -> Self {
        Self {
            program: program.unwrap_or("ffuf").to_string(),
            wordlist: wordlist.unwrap_or(DEFAULT_WORDLIST).to_string(),
        }
    }
}

impl ToolAdapter for FfufAdapter {
    fn name(&self) -> &str {
        "ffuf"
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn build_invocation(&self, target: &Target, config: &ScanConfiguration) -> Result<ToolInvocation, ScanhiveError> {
        let wordlist = config.get_str("wordlist").unwrap_or(&self.wordlist);
        let mut invocation = ToolInvocation::new(&self.program)
            .arg("-u")
            .arg(format!("{}/FUZZ", target.base_url()))
            .arg("-w")
            .arg(wordlist)
            .args(["-json", "-s"]);

        let codes = config.get_list("match_codes");
        if !codes.is_empty() {
            if let Some(bad) = codes.iter().find(|c| c.parse::<u16>().is_err() && c.as_str() != "all") {
                return Err(ScanhiveError::Validation(format!("Invalid ffuf match code '{}'", bad)));
            }
            invocation = invocation.arg("-mc").arg(codes.join(","));
        }
        if let Some(threads) = config.get_u64("threads") {
            invocation = invocation.arg("-t").arg(threads.to_string());
        }
        Ok(invocation)
    }

    fn parse_line(&self, line: &str, target: &Target) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Ignored;
        }
        let Ok(result) = serde_json::from_str::<FfufResult>(line) else {
            return ParsedLine::Unparseable;
        };

        let url = if result.url.is_empty() {
            match result.input.get("FUZZ") {
                Some(word) => format!("{}/{}", target.base_url(), word),
                None => return ParsedLine::Unparseable,
            }
        } else {
            result.url.clone()
        };
        let severity = if (200..300).contains(&result.status) {
            Severity::Low
        } else {
            Severity::Info
        };

        let mut description = format!(
            "status {}, length {}, words {}, lines {}",
            result.status, result.length, result.words, result.lines
        );
        if !result.redirect_location.is_empty() {
            description.push_str(&format!(", redirects to {}", result.redirect_location));
        }

        ParsedLine::Records(vec![NewFinding::new("ffuf", severity, format!("Discovered {} ({})", url, result.status))
            .location(url)
            .description(description)
            .evidence(line)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_success_status_is_low() {
        let adapter = FfufAdapter::new(None, None);
        let line = r#"{"input":{"FUZZ":"admin"},"position":12,"status":200,"length":1543,"words":90,"lines":30,"content-type":"text/html","redirectlocation":"","url":"https://example.com/admin","host":"example.com"}"#;
        let ParsedLine::Records(findings) = adapter.parse_line(line, &target()) else {
            panic!("expected records");
        };
        assert_eq!(findings[0].severity, Severity::Low);
        assert_eq!(findings[0].location, "https://example.com/admin");
        assert_eq!(findings[0].title, "Discovered https://example.com/admin (200)");
    }

    #[test]
    fn test_redirect_is_info() {
        let adapter = FfufAdapter::new(None, None);
        let line = r#"{"input":{"FUZZ":"old"},"status":301,"redirectlocation":"/new","url":""}"#;
        let ParsedLine::Records(findings) = adapter.parse_line(line, &target()) else {
            panic!("expected records");
        };
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].location, "https://example.com/old");
        assert!(findings[0].description.contains("redirects to /new"));
    }

    #[test]
    fn test_progress_text_is_unparseable() {
        let adapter = FfufAdapter::new(None, None);
        assert_eq!(adapter.parse_line(":: Progress: [40/4614]", &target()), ParsedLine::Unparseable);
    }

    #[test]
    fn test_invocation() {
        let adapter = FfufAdapter::new(None, Some("/tmp/words.txt"));
        let config = ScanConfiguration::new().with("match_codes", serde_json::json!(["200", "301"]));
        let inv = adapter.build_invocation(&target(), &config).unwrap();
        assert_eq!(
            inv.args,
            vec!["-u", "https://example.com/FUZZ", "-w", "/tmp/words.txt", "-json", "-s", "-mc", "200,301"]
        );
    }

    #[test]
    fn test_invocation_rejects_bad_match_code() {
        let adapter = FfufAdapter::new(None, None);
        let config = ScanConfiguration::new().with("match_codes", "200,abc");
        assert!(adapter.build_invocation(&target(), &config).is_err());
    }
}
