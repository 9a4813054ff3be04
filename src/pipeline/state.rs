use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::errors::ScanhiveError;

/// Why a scan was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    User,
    TimedOut(Duration),
}

impl CancelReason {
    /// Text stored as the scan's `error_message`.
    pub fn message(&self) -> String {
        match self {
            CancelReason::User => "cancelled by user".to_string(),
            CancelReason::TimedOut(limit) => format!("timed out after {}s", limit.as_secs()),
        }
    }
}

/// Cancellation signal for one running scan. The first recorded reason wins.
#[derive(Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
    reason: OnceLock<CancelReason>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Registry of cancellation handles for scans that are executing.
///
/// Every entry is removed exactly once, and whoever removes it owns the
/// outcome: `cancel` for user cancellation, `complete` for the task itself.
#[derive(Clone, Default)]
pub struct ActiveScans {
    handles: Arc<DashMap<String, Arc<CancelHandle>>>,
}

impl ActiveScans {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh handle. Fails if the id already has one.
    pub fn register(&self, id: &str) -> Result<Arc<CancelHandle>, ScanhiveError> {
        match self.handles.entry(id.to_string()) {
            Entry::Occupied(_) => Err(ScanhiveError::Conflict(format!("Scan {} is already executing", id))),
            Entry::Vacant(slot) => {
                let handle = Arc::new(CancelHandle::new());
                slot.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Claim and signal the handle for `id`. False when nothing is running.
    pub fn cancel(&self, id: &str, reason: CancelReason) -> bool {
        match self.handles.remove(id) {
            Some((_, handle)) => {
                handle.cancel(reason);
                true
            }
            None => false,
        }
    }

    /// Release `handle` on the completion path. Returns false when a
    /// canceller already claimed it.
    pub fn complete(&self, id: &str, handle: &Arc<CancelHandle>) -> bool {
        self.handles
            .remove_if(id, |_, registered| Arc::ptr_eq(registered, handle))
            .is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
