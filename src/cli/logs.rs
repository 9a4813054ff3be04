use crate::cli::commands::LogsArgs;
use crate::cli::render::render_log;
use crate::cli::Context;
use crate::errors::ScanhiveError;

pub async fn handle_logs(ctx: &Context, args: LogsArgs) -> Result<(), ScanhiveError> {
    let manager = ctx.manager().await?;
    // Distinguish an unknown scan from one with no log lines yet.
    manager.get_scan(&args.scan_id).await?;

    for entry in manager.get_logs(&args.scan_id, args.lines).await? {
        println!("{}", render_log(&entry));
    }
    Ok(())
}
