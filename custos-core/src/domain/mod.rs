pub mod error;
pub mod run;
pub mod sla;
pub mod tenant;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
pub use run::{PipelineRun, RunLedger, RunStatus};
pub use sla::{SlaCheckResult, SlaStatus};
pub use tenant::TenantConfig;
