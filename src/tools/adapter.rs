use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::ScanhiveError;
use crate::models::finding::NewFinding;
use crate::models::log_entry::LogLevel;
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::process::run_invocation;

/// A fully resolved command line. Arguments are passed without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of parsing one stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A recognised record. May carry zero findings (e.g. a host with no open ports).
    Records(Vec<NewFinding>),
    /// Known noise such as blank lines or comments.
    Ignored,
    Unparseable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Finding(NewFinding),
    Log { level: LogLevel, message: String },
    /// Relative to the adapter's own run, 0-100.
    Progress(u8),
}

pub type EventSender = mpsc::UnboundedSender<AdapterEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AdapterEvent>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterSummary {
    pub tool: String,
    pub findings: usize,
    pub recognised_lines: usize,
    pub unparseable_lines: usize,
    pub exit_code: Option<i32>,
}

/// Wraps one external scanning program.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Stable tool name, used as the finding source.
    fn name(&self) -> &str;

    /// Program name or path that is spawned.
    fn program(&self) -> &str;

    fn build_invocation(
        &self,
        target: &Target,
        config: &ScanConfiguration,
    ) -> Result<ToolInvocation, ScanhiveError>;

    fn parse_line(&self, line: &str, target: &Target) -> ParsedLine;

    fn is_available(&self) -> bool {
        which::which(self.program()).is_ok()
    }

    /// Run the tool to completion, streaming events as output arrives.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        target: &Target,
        config: &ScanConfiguration,
        events: &EventSender,
    ) -> Result<AdapterSummary, ScanhiveError> {
        let invocation = self.build_invocation(target, config)?;
        run_invocation(self.name(), &invocation, cancel, events, |line| {
            self.parse_line(line, target)
        })
        .await
    }
}

impl std::fmt::Debug for dyn ToolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ToolAdapter({})", self.name())
    }
}
