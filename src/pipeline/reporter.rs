use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::db::ResultStore;
use crate::errors::ScanhiveError;
use crate::models::finding::{Finding, NewFinding};
use crate::models::log_entry::LogLevel;
use crate::models::scan::{ScanConfiguration, ScanStatus};
use crate::models::target::Target;
use crate::tools::{AdapterEvent, AdapterSummary, EventReceiver, ToolAdapter};
use super::phase::ProgressRange;

/// Writes one scan's adapter events to the result store.
///
/// Writes are best-effort: a failed write is logged and the scan carries on.
/// Once the scan's token is cancelled, findings, logs and progress are dropped.
pub struct ScanReporter {
    store: Arc<dyn ResultStore>,
    scan_id: String,
    cancel: CancellationToken,
    high_water: AtomicU8,
}

impl ScanReporter {
    pub fn new(store: Arc<dyn ResultStore>, scan_id: &str, cancel: CancellationToken) -> Self {
        Self {
            store,
            scan_id: scan_id.to_string(),
            cancel,
            high_water: AtomicU8::new(0),
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn progress(&self) -> u8 {
        self.high_water.load(Ordering::SeqCst)
    }

    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        if self.is_cancelled() {
            return;
        }
        let message = message.into();
        if let Err(e) = self.store.append_log(&self.scan_id, level, &message).await {
            warn!(scan_id = %self.scan_id, error = %e, "Failed to persist scan log");
        }
    }

    pub async fn finding(&self, finding: NewFinding) {
        if self.is_cancelled() {
            return;
        }
        let finding = Finding::from_new(&self.scan_id, finding);
        if let Err(e) = self.store.append_finding(&finding).await {
            warn!(scan_id = %self.scan_id, error = %e, "Failed to persist finding");
        }
    }

    /// Record progress if it moves the high-water mark forward.
    pub async fn advance(&self, value: u8) {
        let value = value.min(100);
        if self.is_cancelled() {
            return;
        }
        let previous = self.high_water.fetch_max(value, Ordering::SeqCst);
        if value <= previous {
            return;
        }
        if let Err(e) = self
            .store
            .update_status(&self.scan_id, ScanStatus::Running, Some(value), None)
            .await
        {
            warn!(scan_id = %self.scan_id, error = %e, "Failed to persist progress");
        }
    }

    /// Persist events until the sender side closes. Returns the number of findings seen.
    pub async fn drain(&self, mut events: EventReceiver, range: ProgressRange) -> usize {
        let mut findings = 0;
        while let Some(event) = events.recv().await {
            match event {
                AdapterEvent::Finding(finding) => {
                    findings += 1;
                    self.finding(finding).await;
                }
                AdapterEvent::Log { level, message } => self.log(level, message).await,
                AdapterEvent::Progress(relative) => self.advance(range.scale(relative)).await,
            }
        }
        findings
    }

    /// Execute `adapter` while persisting its events, with progress mapped into `range`.
    pub async fn run_adapter(
        &self,
        adapter: &dyn ToolAdapter,
        target: &Target,
        config: &ScanConfiguration,
        range: ProgressRange,
    ) -> Result<AdapterSummary, ScanhiveError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = self.cancel.clone();
        let execution = async move {
            let result = adapter.execute(&cancel, target, config, &tx).await;
            drop(tx);
            result
        };
        let (result, persisted) = tokio::join!(execution, self.drain(rx, range));
        debug!(scan_id = %self.scan_id, tool = adapter.name(), persisted, "Adapter run finished");
        result
    }
}
