pub mod connection;
pub mod findings;
pub mod logs;
pub mod schema;
pub mod scans;
pub mod store;

pub use connection::Database;
pub use store::ResultStore;

use chrono::{DateTime, SecondsFormat, Utc};

/// Store timestamps as RFC 3339 UTC with microsecond precision.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_ts() -> String {
    format_ts(&Utc::now())
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!(value = raw, error = %e, "Unparseable timestamp in result store");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().map(parse_ts)
}
