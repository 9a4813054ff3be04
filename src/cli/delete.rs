use console::style;

use crate::cli::commands::DeleteArgs;
use crate::cli::Context;
use crate::errors::ScanhiveError;

pub async fn handle_delete(ctx: &Context, args: DeleteArgs) -> Result<(), ScanhiveError> {
    let manager = ctx.manager().await?;
    if !manager.delete_scan(&args.scan_id).await? {
        return Err(ScanhiveError::NotFound(format!("Scan {}", args.scan_id)));
    }
    println!("{} Deleted scan {}", style("✓").green(), style(&args.scan_id).cyan());
    Ok(())
}
