use serde::{Deserialize, Serialize};

use crate::errors::ScanhiveError;

/// A scan target split into the forms different tools want.
///
/// Network tools take `host`, web tools take `url`. CIDR ranges and bare
/// IPv6 addresses are kept intact in `host`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub raw: String,
    pub host: String,
    pub url: String,
    pub port: Option<u16>,
}

impl Target {
    /// Parse a target string (URL, host, host:port, IP or CIDR).
    pub fn parse(raw: &str) -> Result<Self, ScanhiveError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ScanhiveError::Validation("Target must not be empty".into()));
        }
        if raw.starts_with('-') {
            return Err(ScanhiveError::Validation(format!(
                "Target '{}' must not start with '-'",
                raw
            )));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ScanhiveError::Validation(
                "Target must not contain whitespace or control characters".into(),
            ));
        }

        let (host, url, port) = if let Some((_, after_scheme)) = raw.split_once("://") {
            let authority = after_scheme.split(['/', '?', '#']).next().unwrap_or(after_scheme);
            let authority = authority.rsplit('@').next().unwrap_or(authority);
            let (host, port) = split_host_port(authority);
            (host, raw.to_string(), port)
        } else {
            let trimmed = raw.trim_end_matches('/');
            let (host, port) = split_host_port(trimmed);
            (host, format!("http://{}", trimmed), port)
        };

        if host.is_empty() {
            return Err(ScanhiveError::Validation(format!(
                "Target '{}' has no host",
                raw
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            host,
            url,
            port,
        })
    }

    /// Host with an explicit port appended, as `host:port`.
    pub fn host_with_port(&self) -> String {
        match self.port {
            Some(port) if self.host.contains(':') => format!("[{}]:{}", self.host, port),
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// URL without a trailing slash, suitable for appending a path.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

fn split_host_port(authority: &str) -> (String, Option<u16>) {
    // [v6]:port
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse::<u16>().ok());
            return (host.to_string(), port);
        }
    }
    // More than one colon means a bare IPv6 address.
    if authority.matches(':').count() == 1 {
        if let Some((host, port)) = authority.split_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                return (host.to_string(), Some(port));
            }
        }
    }
    (authority.to_string(), None)
}
