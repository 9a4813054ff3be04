use console::style;

use crate::cli::render::render_tool;
use crate::cli::Context;
use crate::errors::ScanhiveError;
use crate::pipeline::ScanCatalog;

pub async fn handle_tools(ctx: &Context) -> Result<(), ScanhiveError> {
    let config = ctx.config().await?;
    let statuses = ScanCatalog::from_config(&config).tool_statuses();

    println!("{}", style("Scanning tools").bold());
    for tool in &statuses {
        println!("{}", render_tool(tool));
    }
    let missing = statuses.iter().filter(|t| !t.available).count();
    if missing > 0 {
        println!(
            "\n{} {} tool(s) not found; scan types that need them will fail",
            style("!").yellow().bold(),
            missing
        );
    }
    Ok(())
}
