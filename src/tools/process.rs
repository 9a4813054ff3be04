use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ScanhiveError;
use crate::models::log_entry::LogLevel;
use super::adapter::{AdapterEvent, AdapterSummary, EventSender, ParsedLine, ToolInvocation};

const STDERR_TAIL_LINES: usize = 20;
/// How long stderr may stay open after the tool exits. Helpers it spawned can hold the pipe.
const STDERR_DRAIN_GRACE: Duration = Duration::from_secs(2);
const MAX_LOGGED_LINE: usize = 300;

const PROGRESS_SPAWNED: u8 = 5;
const PROGRESS_FIRST_RECORD: u8 = 10;
const PROGRESS_CEILING: u8 = 90;

/// Estimated progress after `findings` records have been parsed.
pub fn estimate_progress(findings: usize) -> u8 {
    if findings == 0 {
        return PROGRESS_SPAWNED;
    }
    let estimate = PROGRESS_FIRST_RECORD as usize + findings - 1;
    estimate.min(PROGRESS_CEILING as usize) as u8
}

fn emit(events: &EventSender, event: AdapterEvent) {
    // A dropped receiver only means nobody is listening any more.
    let _ = events.send(event);
}

fn emit_log(events: &EventSender, level: LogLevel, message: String) {
    emit(events, AdapterEvent::Log { level, message });
}

fn clip(line: &str) -> &str {
    match line.char_indices().nth(MAX_LOGGED_LINE) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Spawn `invocation`, feed each stdout line through `parse` and stream the
/// results as events.
///
/// Cancellation kills the child and returns `Cancelled`. Output that parsed
/// wins over a non-zero exit status; no parsed output plus a failed exit is
/// an `Execution` error.
pub async fn run_invocation<F>(
    tool: &str,
    invocation: &ToolInvocation,
    cancel: &CancellationToken,
    events: &EventSender,
    parse: F,
) -> Result<AdapterSummary, ScanhiveError>
where
    F: Fn(&str) -> ParsedLine + Send + Sync,
{
    if cancel.is_cancelled() {
        return Err(ScanhiveError::Cancelled(format!("{} cancelled before start", tool)));
    }

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(tool, command = %invocation.command_line(), "Spawning tool");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanhiveError::ToolUnavailable(format!(
                "{} is not installed or not executable ({})",
                tool, invocation.program
            )));
        }
        Err(e) => {
            return Err(ScanhiveError::Execution(format!("failed to start {}: {}", tool, e)));
        }
    };

    emit_log(events, LogLevel::Info, format!("Running: {}", invocation.command_line()));
    emit(events, AdapterEvent::Progress(PROGRESS_SPAWNED));

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScanhiveError::Internal(format!("{} stdout was not captured", tool)))?;
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(collect_stderr(stderr, events.clone())));

    let mut summary = AdapterSummary {
        tool: tool.to_string(),
        ..Default::default()
    };
    let mut last_progress = PROGRESS_SPAWNED;
    let mut lines = BufReader::new(stdout).lines();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(tool, error = %e, "Failed to kill cancelled tool");
                }
                if let Some(task) = &stderr_task {
                    task.abort();
                }
                return Err(ScanhiveError::Cancelled(format!("{} cancelled", tool)));
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim_end();
                    match parse(line) {
                        ParsedLine::Records(findings) => {
                            summary.recognised_lines += 1;
                            for finding in findings {
                                summary.findings += 1;
                                emit(events, AdapterEvent::Finding(finding));
                            }
                            let progress = estimate_progress(summary.findings);
                            if progress > last_progress {
                                last_progress = progress;
                                emit(events, AdapterEvent::Progress(progress));
                            }
                        }
                        ParsedLine::Ignored => {}
                        ParsedLine::Unparseable => {
                            summary.unparseable_lines += 1;
                            emit_log(events, LogLevel::Debug, format!("Skipped unparseable {} output: {}", tool, clip(line)));
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    emit_log(events, LogLevel::Warning, format!("Stopped reading {} output: {}", tool, e));
                    break;
                }
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                warn!(tool, error = %e, "Failed to kill cancelled tool");
            }
            if let Some(task) = &stderr_task {
                task.abort();
            }
            return Err(ScanhiveError::Cancelled(format!("{} cancelled", tool)));
        }
        status = child.wait() => status?,
    };

    let stderr_tail = match stderr_task {
        Some(mut task) => tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                task.abort();
                return Err(ScanhiveError::Cancelled(format!("{} cancelled", tool)));
            }
            joined = tokio::time::timeout(STDERR_DRAIN_GRACE, &mut task) => match joined {
                Ok(tail) => tail.unwrap_or_default(),
                Err(_) => {
                    task.abort();
                    debug!(tool, "stderr still open after exit, no longer reading it");
                    VecDeque::new()
                }
            },
        },
        None => VecDeque::new(),
    };

    summary.exit_code = status.code();
    let exit_label = match status.code() {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    };

    if status.success() {
        debug!(tool, findings = summary.findings, "Tool finished");
        return Ok(summary);
    }

    if summary.recognised_lines > 0 {
        emit_log(
            events,
            LogLevel::Warning,
            format!("{} exited with {} after producing {} findings", tool, exit_label, summary.findings),
        );
        return Ok(summary);
    }

    for line in &stderr_tail {
        emit_log(events, LogLevel::Error, format!("{} stderr: {}", tool, line));
    }
    Err(ScanhiveError::Execution(format!(
        "{} exited with {} and produced no parseable output",
        tool, exit_label
    )))
}

/// Forward stderr lines as debug logs and keep the last few for failure reports.
async fn collect_stderr(stderr: ChildStderr, events: EventSender) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        emit_log(&events, LogLevel::Debug, clip(line).to_string());
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(clip(line).to_string());
    }
    tail
}
