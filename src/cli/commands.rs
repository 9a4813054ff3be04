use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "scanhive", version, about = "Run external security tools as tracked, cancellable scan jobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// SQLite database path (overrides config and SCANHIVE_DB)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Process log format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scan and wait for it to finish
    Scan(ScanArgs),
    /// List stored scans, newest first
    List(ListArgs),
    /// Show one scan's status and summary
    Query(QueryArgs),
    /// Show a scan's findings, most severe first
    Findings(FindingsArgs),
    /// Show a scan's log entries
    Logs(LogsArgs),
    /// Delete a scan with its findings and logs
    Delete(DeleteArgs),
    /// Report which scanning tools are installed
    Tools,
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Host, CIDR or URL to scan
    #[arg(short, long)]
    pub target: String,

    /// Scan type: quick, service, masscan, dns, subdomain, vuln, web_fuzz, full_recon, full_web
    #[arg(short = 'T', long = "type")]
    pub scan_type: String,

    /// Display name (defaults to "<type> - <target>")
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Scan configuration entry, repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Scan configuration as a JSON object; --set entries override it
    #[arg(long)]
    pub config_json: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "500")]
    pub interval: u64,

    /// Only print the final status line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Clone)]
pub struct ListArgs {
    /// Filter by scan type
    #[arg(long = "type")]
    pub scan_type: Option<String>,

    /// Filter by status
    #[arg(long)]
    pub status: Option<String>,

    /// Maximum number of scans
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct QueryArgs {
    /// Scan ID to query
    pub scan_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct FindingsArgs {
    /// Scan ID
    pub scan_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct LogsArgs {
    /// Scan ID
    pub scan_id: String,

    /// Number of most recent lines to show
    #[arg(short, long)]
    pub lines: Option<usize>,
}

#[derive(Args, Clone)]
pub struct DeleteArgs {
    /// Scan ID to delete
    pub scan_id: String,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(value_name = "CONFIG")]
    pub path: String,
}
