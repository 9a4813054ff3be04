use super::types::ScanhiveError;
use crate::models::scan::ScanStatus;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    /// Terminal status a scan ends in when its execution returns this error.
    pub terminal_status: ScanStatus,
}

impl ScanhiveError {
    /// Classify this error to determine its type and the terminal status it maps to.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            ScanhiveError::Cancelled(_) => ErrorClassification {
                error_type: "CancellationError",
                terminal_status: ScanStatus::Cancelled,
            },
            ScanhiveError::Execution(_) => ErrorClassification {
                error_type: "ExecutionError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::ToolUnavailable(_) => ErrorClassification {
                error_type: "ToolUnavailableError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Validation(_) => ErrorClassification {
                error_type: "ValidationError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Conflict(_) => ErrorClassification {
                error_type: "ConflictError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Database(_) => ErrorClassification {
                error_type: "PersistenceError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Io(_) => ErrorClassification {
                error_type: "IoError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                terminal_status: ScanStatus::Failed,
            },
            ScanhiveError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                terminal_status: ScanStatus::Failed,
            },
        }
    }

    /// Short human-readable text stored as a scan's `error_message`.
    /// Full detail belongs in the scan's log stream.
    pub fn short_message(&self) -> String {
        match self {
            ScanhiveError::Cancelled(msg)
            | ScanhiveError::Execution(msg)
            | ScanhiveError::ToolUnavailable(msg)
            | ScanhiveError::Validation(msg) => msg.clone(),
            ScanhiveError::Database(_) => "result store unavailable".to_string(),
            other => other.to_string(),
        }
    }
}
