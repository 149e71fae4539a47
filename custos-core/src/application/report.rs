// custos-core/src/application/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::run::RunStatus;
use crate::domain::sla::{SlaCheckResult, SlaStatus};

// Process exit codes (CI/CD contract)
pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG_ERROR: i32 = 1;
pub const EXIT_SLA_BREACH: i32 = 2;
pub const EXIT_RUN_FAILED: i32 = 3;

/// Terminal outcome of one tenant cycle inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantOutcome {
    pub org_id: String,
    pub run_id: Option<String>,
    pub status: RunStatus,
    pub sla: Option<SlaCheckResult>,
    pub error: Option<String>,
}

/// Summary of one batch invocation, driving logs and the exit code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TenantOutcome>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == RunStatus::Failed)
    }

    pub fn has_breaches(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(&o.sla, Some(s) if s.status == SlaStatus::SlaBreach))
    }

    /// Failures dominate breaches; a clean batch exits 0. Config errors
    /// never reach a report — the CLI exits 1 before any tenant runs.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            EXIT_RUN_FAILED
        } else if self.has_breaches() {
            EXIT_SLA_BREACH
        } else {
            EXIT_OK
        }
    }
}
