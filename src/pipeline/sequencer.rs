use tracing::{info, warn};

use crate::errors::ScanhiveError;
use crate::models::log_entry::LogLevel;
use crate::models::scan::ScanConfiguration;
use crate::models::target::Target;
use super::phase::{progress_ranges, Phase};
use super::reporter::ScanReporter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub findings: usize,
}

/// Runs phases in order, tolerating individual phase failures.
pub struct PhaseSequencer {
    phases: Vec<Phase>,
}

impl PhaseSequencer {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    pub async fn run(
        &self,
        reporter: &ScanReporter,
        target: &Target,
        config: &ScanConfiguration,
    ) -> Result<SequenceOutcome, ScanhiveError> {
        let weights: Vec<u32> = self.phases.iter().map(|p| p.weight).collect();
        let ranges = progress_ranges(&weights);
        let mut outcome = SequenceOutcome::default();

        for (phase, range) in self.phases.iter().zip(ranges) {
            if reporter.is_cancelled() {
                return Err(ScanhiveError::Cancelled(format!("cancelled before phase {}", phase.name)));
            }

            let tool = phase.adapter.name();
            if !phase.adapter.is_available() {
                info!(scan_id = reporter.scan_id(), phase = %phase.name, tool, "Skipping phase, tool not available");
                reporter
                    .log(LogLevel::Info, format!("Phase {} skipped: {} is not available", phase.name, tool))
                    .await;
                outcome.skipped.push(phase.name.clone());
                reporter.advance(range.end).await;
                continue;
            }

            reporter
                .log(LogLevel::Info, format!("Phase {} started ({})", phase.name, tool))
                .await;
            match reporter.run_adapter(phase.adapter.as_ref(), target, config, range).await {
                Ok(summary) => {
                    reporter
                        .log(
                            LogLevel::Info,
                            format!("Phase {} completed with {} findings", phase.name, summary.findings),
                        )
                        .await;
                    outcome.findings += summary.findings;
                    outcome.succeeded.push(phase.name.clone());
                }
                Err(e @ ScanhiveError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    warn!(scan_id = reporter.scan_id(), phase = %phase.name, error = %e, "Phase failed, continuing");
                    reporter
                        .log(LogLevel::Warning, format!("Phase {} failed: {}", phase.name, e.short_message()))
                        .await;
                    outcome.failed.push(phase.name.clone());
                }
            }
            reporter.advance(range.end).await;
        }

        if reporter.is_cancelled() {
            return Err(ScanhiveError::Cancelled("cancelled after final phase".into()));
        }

        if outcome.succeeded.is_empty() {
            return Err(ScanhiveError::Execution(format!(
                "no phase succeeded (failed: [{}], skipped: [{}])",
                outcome.failed.join(", "),
                outcome.skipped.join(", ")
            )));
        }

        Ok(outcome)
    }
}
