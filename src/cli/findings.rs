use crate::cli::commands::FindingsArgs;
use crate::cli::render::{render_counts, render_finding};
use crate::cli::Context;
use crate::errors::ScanhiveError;

pub async fn handle_findings(ctx: &Context, args: FindingsArgs) -> Result<(), ScanhiveError> {
    let manager = ctx.manager().await?;
    let summary = manager.summarize(&args.scan_id).await?;
    let findings = manager.get_findings(&args.scan_id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }

    println!("{} findings: {}", findings.len(), render_counts(&summary.counts));
    for finding in &findings {
        println!("{}", render_finding(finding));
    }
    Ok(())
}
