use crate::cli::commands::ListArgs;
use crate::cli::render::render_scan_row;
use crate::cli::Context;
use crate::errors::ScanhiveError;
use crate::models::scan::{ScanFilter, ScanStatus, ScanType};

pub async fn handle_list(ctx: &Context, args: ListArgs) -> Result<(), ScanhiveError> {
    let filter = ScanFilter {
        scan_type: args.scan_type.as_deref().map(str::parse::<ScanType>).transpose()?,
        status: args.status.as_deref().map(str::parse::<ScanStatus>).transpose()?,
        limit: args.limit,
    };
    let manager = ctx.manager().await?;
    let scans = manager.list_scans(&filter).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scans)?);
        return Ok(());
    }
    if scans.is_empty() {
        println!("No scans found");
        return Ok(());
    }
    for record in &scans {
        println!("{}", render_scan_row(record));
    }
    Ok(())
}
