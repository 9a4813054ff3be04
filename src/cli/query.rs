use serde_json::json;
use tracing::info;

use crate::cli::commands::QueryArgs;
use crate::cli::render::render_scan_detail;
use crate::cli::Context;
use crate::errors::ScanhiveError;

pub async fn handle_query(ctx: &Context, args: QueryArgs) -> Result<(), ScanhiveError> {
    info!(scan_id = %args.scan_id, "Querying scan status");

    let manager = ctx.manager().await?;
    let record = manager.get_scan(&args.scan_id).await?;
    let summary = manager.summarize(&record.id).await?;

    if args.json {
        let body = json!({ "scan": record, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", render_scan_detail(&record, &summary));
    }
    Ok(())
}
