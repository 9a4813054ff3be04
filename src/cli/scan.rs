use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::commands::ScanArgs;
use crate::cli::render::{render_finding, render_scan_detail};
use crate::cli::Context;
use crate::errors::ScanhiveError;
use crate::models::scan::{CreateScanRequest, ScanStatus};

pub async fn handle_scan(ctx: &Context, args: ScanArgs) -> Result<(), ScanhiveError> {
    let configuration = build_configuration(args.config_json.as_deref(), &args.set)?;
    let manager = ctx.manager().await?;

    let record = manager
        .create_scan(CreateScanRequest {
            name: args.name.clone(),
            target: args.target.clone(),
            scan_type: args.scan_type.clone(),
            configuration,
        })
        .await?;
    info!(scan_id = %record.id, "Scan submitted");

    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {bar:30.cyan/dark_gray} {pos:>3}% | {elapsed} | {msg}")
                .map_err(|e| ScanhiveError::Internal(format!("Invalid progress template: {}", e)))?
                .progress_chars("█▓░"),
        );
        bar.set_message(format!("{} {}", record.scan_type, record.target));
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    };

    let interval = Duration::from_millis(args.interval.max(50));
    let mut cancel_sent = false;
    let last = loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let current = manager.get_scan(&record.id).await?;
                bar.set_position(current.progress as u64);
                if current.status.is_terminal() {
                    break current;
                }
                if current.status == ScanStatus::Running && !cancel_sent {
                    bar.set_message(format!("{} {} (running)", current.scan_type, current.target));
                }
            }
            result = tokio::signal::ctrl_c(), if !cancel_sent => {
                if result.is_ok() {
                    cancel_sent = true;
                    manager.cancel(&record.id);
                    bar.set_message("cancelling...");
                }
            }
        }
    };
    bar.finish_and_clear();

    let summary = manager.summarize(&last.id).await?;
    println!("{}", render_scan_detail(&last, &summary));

    if !args.quiet {
        let findings = manager.get_findings(&last.id).await?;
        if !findings.is_empty() {
            println!("\n{}", style("Findings").bold());
            for finding in &findings {
                println!("{}", render_finding(finding));
            }
        }
    }

    match last.status {
        ScanStatus::Completed => Ok(()),
        ScanStatus::Cancelled => Err(ScanhiveError::Cancelled(
            last.error_message.unwrap_or_else(|| "cancelled".to_string()),
        )),
        _ => Err(ScanhiveError::Execution(
            last.error_message.unwrap_or_else(|| "scan failed".to_string()),
        )),
    }
}

/// Merge `--config-json` and `--set key=value` entries into one JSON object.
pub fn build_configuration(json: Option<&str>, sets: &[String]) -> Result<Value, ScanhiveError> {
    let mut map = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => {
                return Err(ScanhiveError::Validation(
                    "--config-json must be a JSON object".to_string(),
                ))
            }
        },
        None => Map::new(),
    };

    for entry in sets {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(ScanhiveError::Validation(format!(
                "Invalid --set entry '{}', expected KEY=VALUE",
                entry
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ScanhiveError::Validation(format!("Empty key in --set entry '{}'", entry)));
        }
        map.insert(key.to_string(), scalar(value));
    }
    Ok(Value::Object(map))
}

fn scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<u64>() {
        return Value::from(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
