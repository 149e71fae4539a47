// custos-core/src/domain/run.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One tenant cycle's bookkeeping entry. Mutated only through the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub org_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub detail: Option<String>,
}

/// Append-only run ledger with a per-org single-writer guard.
///
/// The guard is the defining rule: never two RUNNING runs for the same
/// org_id. A duplicate request is rejected with `ConcurrentRun` before any
/// side effect (no double-crawling, no double-billed scans).
#[derive(Default)]
pub struct RunLedger {
    inner: Mutex<LedgerInner>,
    seq: AtomicU64,
}

#[derive(Default)]
struct LedgerInner {
    runs: Vec<PipelineRun>,
    running: HashSet<String>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// PENDING -> RUNNING, guarded. Returns the accepted run's id.
    pub fn try_begin(&self, org_id: &str) -> Result<String, DomainError> {
        let mut inner = self.lock();
        if inner.running.contains(org_id) {
            return Err(DomainError::ConcurrentRun(org_id.to_string()));
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let run_id = format!("run_{}_{}_{}", org_id, now.timestamp_millis(), seq);

        inner.running.insert(org_id.to_string());
        inner.runs.push(PipelineRun {
            run_id: run_id.clone(),
            org_id: org_id.to_string(),
            started_at: now,
            finished_at: None,
            status: RunStatus::Running,
            detail: None,
        });

        Ok(run_id)
    }

    /// RUNNING -> SUCCEEDED | FAILED. Releases the per-org guard.
    pub fn finish(
        &self,
        run_id: &str,
        status: RunStatus,
        detail: Option<String>,
    ) -> Result<(), DomainError> {
        debug_assert!(matches!(status, RunStatus::Succeeded | RunStatus::Failed));
        let mut inner = self.lock();

        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| DomainError::RunNotFound(run_id.to_string()))?;

        run.status = status;
        run.finished_at = Some(Utc::now());
        run.detail = detail;

        let org_id = run.org_id.clone();
        inner.running.remove(&org_id);
        Ok(())
    }

    pub fn is_running(&self, org_id: &str) -> bool {
        self.lock().running.contains(org_id)
    }

    /// Snapshot for audit / reporting.
    pub fn runs(&self) -> Vec<PipelineRun> {
        self.lock().runs.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        // A poisoned ledger means a panic mid-append; the data is still
        // coherent (append-only), so we keep going.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
