use std::time::Duration;

use console::style;

use crate::models::finding::{Finding, Severity, SeverityCounts};
use crate::models::log_entry::{LogEntry, LogLevel};
use crate::models::scan::{ScanRecord, ScanStatus};
use crate::pipeline::catalog::ToolStatus;
use crate::pipeline::metrics::ScanSummary;

pub fn render_severity_badge(severity: Severity) -> String {
    match severity {
        Severity::Critical => style(" CRITICAL ").on_red().white().bold().to_string(),
        Severity::High => style(" HIGH ").red().bold().to_string(),
        Severity::Medium => style(" MEDIUM ").yellow().bold().to_string(),
        Severity::Low => style(" LOW ").blue().to_string(),
        Severity::Info => style(" INFO ").dim().to_string(),
    }
}

pub fn render_status(status: ScanStatus) -> String {
    match status {
        ScanStatus::Pending => style(status.as_str()).dim().to_string(),
        ScanStatus::Running => style(status.as_str()).cyan().to_string(),
        ScanStatus::Completed => style(status.as_str()).green().bold().to_string(),
        ScanStatus::Failed => style(status.as_str()).red().bold().to_string(),
        ScanStatus::Cancelled => style(status.as_str()).yellow().to_string(),
    }
}

pub fn render_finding(finding: &Finding) -> String {
    let mut line = format!(
        "  {} {} {}",
        render_severity_badge(finding.severity),
        finding.title,
        style(format!("[{}]", finding.source)).dim(),
    );
    if !finding.location.is_empty() {
        line.push_str(&format!("\n      {}", style(&finding.location).cyan()));
    }
    if !finding.description.is_empty() && finding.description != finding.title {
        line.push_str(&format!("\n      {}", style(&finding.description).dim()));
    }
    line
}

pub fn render_log(entry: &LogEntry) -> String {
    let level = match entry.level {
        LogLevel::Debug => style("DEBUG").dim().to_string(),
        LogLevel::Info => style("INFO ").green().to_string(),
        LogLevel::Warning => style("WARN ").yellow().to_string(),
        LogLevel::Error => style("ERROR").red().bold().to_string(),
    };
    format!(
        "{} {} {}",
        style(entry.created_at.format("%Y-%m-%d %H:%M:%S%.3f")).dim(),
        level,
        entry.message
    )
}

pub fn render_scan_row(record: &ScanRecord) -> String {
    format!(
        "{}  {:<10} {:<10} {:>3}%  {}  {}",
        style(&record.id).cyan(),
        record.scan_type.as_str(),
        render_status(record.status),
        record.progress,
        record.target,
        style(record.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
    )
}

pub fn render_scan_detail(record: &ScanRecord, summary: &ScanSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", style("Scan").bold(), style(&record.id).cyan()));
    out.push_str(&format!("  Name:     {}\n", record.name));
    out.push_str(&format!("  Target:   {}\n", record.target));
    out.push_str(&format!("  Type:     {}\n", record.scan_type));
    out.push_str(&format!("  Status:   {}\n", render_status(record.status)));
    out.push_str(&format!("  Progress: {}%\n", record.progress));
    out.push_str(&format!("  Created:  {}\n", record.created_at.to_rfc3339()));
    if let Some(started) = record.started_at {
        out.push_str(&format!("  Started:  {}\n", started.to_rfc3339()));
    }
    if let Some(completed) = record.completed_at {
        out.push_str(&format!("  Finished: {}\n", completed.to_rfc3339()));
    }
    if let Some(duration) = summary.duration() {
        out.push_str(&format!("  Duration: {}\n", format_duration(duration)));
    }
    if let Some(error) = &record.error_message {
        out.push_str(&format!("  Error:    {}\n", style(error).red()));
    }
    out.push_str(&format!("  Findings: {}", render_counts(&summary.counts)));
    out
}

pub fn render_counts(counts: &SeverityCounts) -> String {
    if counts.total() == 0 {
        return style("none").dim().to_string();
    }
    Severity::ALL
        .iter()
        .filter(|s| counts.get(**s) > 0)
        .map(|s| format!("{}{}", render_severity_badge(*s), counts.get(*s)))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_tool(tool: &ToolStatus) -> String {
    let mark = if tool.available {
        style("✓").green().to_string()
    } else {
        style("✗").red().to_string()
    };
    format!("  {} {:<10} {}", mark, tool.name, style(&tool.program).dim())
}

pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis() as u64;
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if ms < 3_600_000 {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = ms / 3_600_000;
        let mins = (ms % 3_600_000) / 60_000;
        format!("{}h {}m", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3720)), "1h 2m");
    }

    #[test]
    fn test_render_counts_skips_zero_severities() {
        console::set_colors_enabled(false);
        let mut counts = SeverityCounts::default();
        counts.add(Severity::High, 2);
        let rendered = render_counts(&counts);
        assert!(rendered.contains("HIGH"));
        assert!(!rendered.contains("LOW"));
        assert_eq!(render_counts(&SeverityCounts::default()), "none");
    }
}
