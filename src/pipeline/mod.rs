pub mod catalog;
pub mod manager;
pub mod metrics;
pub mod phase;
pub mod reporter;
pub mod sequencer;
pub mod state;

pub use catalog::{ExecutionPlan, ScanCatalog, ToolStatus};
pub use manager::ScanManager;
pub use metrics::ScanSummary;
pub use phase::{Phase, ProgressRange};
pub use reporter::ScanReporter;
pub use sequencer::{PhaseSequencer, SequenceOutcome};
pub use state::{ActiveScans, CancelHandle, CancelReason};
