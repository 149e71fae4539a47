// custos-core/src/application/mod.rs

pub mod report;
pub mod retry;
pub mod runner;
pub mod sla;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Cela permet au CLI de faire :
// `use custos_core::application::{PipelineRunner, RunnerConfig, BatchReport};`
// sans avoir à connaître la structure interne des fichiers.

pub use report::{
    BatchReport, EXIT_CONFIG_ERROR, EXIT_OK, EXIT_RUN_FAILED, EXIT_SLA_BREACH, TenantOutcome,
};
pub use retry::RetryPolicy;
pub use runner::{PipelineRunner, RunnerConfig, ShutdownHandle};
pub use sla::check_freshness;
