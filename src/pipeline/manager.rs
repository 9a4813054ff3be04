use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::security::validate_scan_configuration;
use crate::config::EngineConfig;
use crate::db::ResultStore;
use crate::errors::ScanhiveError;
use crate::models::finding::Finding;
use crate::models::log_entry::{LogEntry, LogLevel};
use crate::models::scan::{
    CreateScanRequest, ScanConfiguration, ScanFilter, ScanRecord, ScanStatus, ScanType,
};
use crate::models::target::Target;
use super::catalog::{ExecutionPlan, ScanCatalog, ToolStatus};
use super::metrics::{completion_line, ScanSummary};
use super::phase::ProgressRange;
use super::reporter::ScanReporter;
use super::sequencer::PhaseSequencer;
use super::state::{ActiveScans, CancelHandle, CancelReason};

/// Owns the scan lifecycle: validation, launch, cancellation and timeouts.
///
/// Execution is fire-and-forget. Callers observe outcomes by polling the store.
#[derive(Clone)]
pub struct ScanManager {
    store: Arc<dyn ResultStore>,
    catalog: Arc<ScanCatalog>,
    config: Arc<EngineConfig>,
    active: ActiveScans,
}

impl ScanManager {
    pub fn new(store: Arc<dyn ResultStore>, catalog: Arc<ScanCatalog>, config: Arc<EngineConfig>) -> Self {
        Self {
            store,
            catalog,
            config,
            active: ActiveScans::new(),
        }
    }

    /// Standard catalog for `config`.
    pub fn with_config(store: Arc<dyn ResultStore>, config: EngineConfig) -> Self {
        let catalog = ScanCatalog::from_config(&config);
        Self::new(store, Arc::new(catalog), Arc::new(config))
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Validate, persist as pending and launch. Returns the pending record.
    pub async fn create_scan(&self, request: CreateScanRequest) -> Result<ScanRecord, ScanhiveError> {
        let scan_type: ScanType = request.scan_type.parse()?;
        let target_text = request.target.trim();
        Target::parse(target_text)?;

        let configuration = ScanConfiguration::from_value(request.configuration)?;
        let configuration = self.config.merged_configuration(scan_type, configuration);
        validate_scan_configuration(&configuration)?;
        self.catalog.plan(scan_type)?;

        let record = ScanRecord::new_pending(&request.name, target_text, scan_type, configuration);
        self.store.create_scan(&record).await?;
        info!(scan_id = %record.id, scan_type = %scan_type, target = %record.target, "Scan created");

        self.start(&record)?;
        Ok(record)
    }

    /// Launch execution for a persisted pending record.
    pub fn start(&self, record: &ScanRecord) -> Result<(), ScanhiveError> {
        if record.status != ScanStatus::Pending {
            return Err(ScanhiveError::Conflict(format!(
                "Scan {} is {}, only pending scans can be started",
                record.id, record.status
            )));
        }
        let target = Target::parse(&record.target)?;
        let plan = self.catalog.plan(record.scan_type)?.clone();
        let handle = self.active.register(&record.id)?;
        let timeout = record
            .configuration
            .timeout()
            .unwrap_or_else(|| self.config.timeout_for(record.scan_type));

        let job = ScanJob {
            store: self.store.clone(),
            active: self.active.clone(),
            handle,
            scan_id: record.id.clone(),
            scan_type: record.scan_type,
            configuration: record.configuration.clone(),
            target,
            plan,
            timeout,
        };
        tokio::spawn(job.run());
        Ok(())
    }

    /// Signal a running or launching scan. False when it is not active.
    pub fn cancel(&self, id: &str) -> bool {
        let claimed = self.active.cancel(id, CancelReason::User);
        if claimed {
            info!(scan_id = id, "Cancellation requested");
        }
        claimed
    }

    /// Cancel if active, then remove the scan with its findings and logs.
    pub async fn delete_scan(&self, id: &str) -> Result<bool, ScanhiveError> {
        self.cancel(id);
        let deleted = self.store.delete_scan(id).await?;
        if deleted {
            info!(scan_id = id, "Scan deleted");
        }
        Ok(deleted)
    }

    pub async fn get_scan(&self, id: &str) -> Result<ScanRecord, ScanhiveError> {
        self.store
            .get_scan(id)
            .await?
            .ok_or_else(|| ScanhiveError::NotFound(format!("Scan {}", id)))
    }

    pub async fn list_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, ScanhiveError> {
        self.store.list_scans(filter).await
    }

    pub async fn get_findings(&self, id: &str) -> Result<Vec<Finding>, ScanhiveError> {
        self.store.get_findings(id).await
    }

    pub async fn get_logs(&self, id: &str, tail: Option<usize>) -> Result<Vec<LogEntry>, ScanhiveError> {
        self.store.get_logs(id, tail).await
    }

    pub async fn summarize(&self, id: &str) -> Result<ScanSummary, ScanhiveError> {
        let record = self.get_scan(id).await?;
        ScanSummary::compute(self.store.as_ref(), &record).await
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn available_tools(&self) -> Vec<ToolStatus> {
        self.catalog.tool_statuses()
    }
}

/// Everything one spawned execution needs, moved into its task.
struct ScanJob {
    store: Arc<dyn ResultStore>,
    active: ActiveScans,
    handle: Arc<CancelHandle>,
    scan_id: String,
    scan_type: ScanType,
    configuration: ScanConfiguration,
    target: Target,
    plan: ExecutionPlan,
    timeout: Duration,
}

impl ScanJob {
    async fn run(self) {
        match self.store.update_status(&self.scan_id, ScanStatus::Running, Some(0), None).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(scan_id = %self.scan_id, "Scan is no longer pending, not starting");
                self.active.complete(&self.scan_id, &self.handle);
                return;
            }
            Err(e) => {
                error!(scan_id = %self.scan_id, error = %e, "Failed to mark scan running");
                self.active.complete(&self.scan_id, &self.handle);
                return;
            }
        }
        info!(
            scan_id = %self.scan_id,
            scan_type = %self.scan_type,
            timeout_secs = self.timeout.as_secs(),
            "Scan started"
        );

        let reporter = ScanReporter::new(self.store.clone(), &self.scan_id, self.handle.token().clone());
        let result = {
            let execution = self.execute(&reporter);
            tokio::pin!(execution);
            tokio::select! {
                result = &mut execution => result,
                _ = tokio::time::sleep(self.timeout) => {
                    warn!(scan_id = %self.scan_id, timeout_secs = self.timeout.as_secs(), "Scan timed out");
                    self.handle.cancel(CancelReason::TimedOut(self.timeout));
                    execution.await
                }
            }
        };

        // Losing the claim means a canceller removed the handle; its reason may not be set yet.
        let claimed = self.active.complete(&self.scan_id, &self.handle);
        let reason = match self.handle.reason() {
            Some(reason) => Some(reason),
            None if !claimed => Some(CancelReason::User),
            None => None,
        };

        self.finish(reason, result).await;
    }

    async fn execute(&self, reporter: &ScanReporter) -> Result<(), ScanhiveError> {
        match &self.plan {
            ExecutionPlan::Single(adapter) => {
                let summary = reporter
                    .run_adapter(adapter.as_ref(), &self.target, &self.configuration, ProgressRange::FULL)
                    .await?;
                info!(
                    scan_id = %self.scan_id,
                    tool = %summary.tool,
                    findings = summary.findings,
                    unparseable = summary.unparseable_lines,
                    "Tool finished"
                );
            }
            ExecutionPlan::Sequence(phases) => {
                let outcome = PhaseSequencer::new(phases.clone())
                    .run(reporter, &self.target, &self.configuration)
                    .await?;
                info!(
                    scan_id = %self.scan_id,
                    succeeded = outcome.succeeded.len(),
                    failed = outcome.failed.len(),
                    skipped = outcome.skipped.len(),
                    findings = outcome.findings,
                    "Sequence finished"
                );
            }
        }
        Ok(())
    }

    /// Write the closing log line, then the terminal status. Nothing is written after.
    async fn finish(&self, reason: Option<CancelReason>, result: Result<(), ScanhiveError>) {
        let (status, progress, error_message, level, message) = match (reason, result) {
            (Some(reason), _) => {
                let text = reason.message();
                (ScanStatus::Cancelled, None, Some(text.clone()), LogLevel::Warning, format!("Scan {}", text))
            }
            (None, Ok(())) => {
                let line = match self.store.finding_counts(&self.scan_id).await {
                    Ok(counts) => completion_line(&counts),
                    Err(e) => {
                        warn!(scan_id = %self.scan_id, error = %e, "Failed to count findings");
                        "Scan completed".to_string()
                    }
                };
                (ScanStatus::Completed, Some(100), None, LogLevel::Info, line)
            }
            (None, Err(e)) => {
                let class = e.classify();
                let short = e.short_message();
                warn!(scan_id = %self.scan_id, error_type = class.error_type, error = %e, "Scan execution failed");
                let message = format!("Scan failed ({}): {}", class.error_type, short);
                (class.terminal_status, None, Some(short), LogLevel::Error, message)
            }
        };

        if let Err(e) = self.store.append_log(&self.scan_id, level, &message).await {
            warn!(scan_id = %self.scan_id, error = %e, "Failed to persist closing log entry");
        }

        match self
            .store
            .update_status(&self.scan_id, status, progress, error_message.as_deref())
            .await
        {
            Ok(true) => info!(scan_id = %self.scan_id, status = %status, "Scan finished"),
            Ok(false) => warn!(scan_id = %self.scan_id, status = %status, "Terminal status not applied"),
            Err(e) => error!(scan_id = %self.scan_id, error = %e, "Failed to persist terminal status"),
        }
    }
}
