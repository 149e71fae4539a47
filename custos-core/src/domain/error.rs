// custos-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Tenant '{0}' not found in registry")]
    #[diagnostic(
        code(custos::domain::tenant_not_found),
        help("Check the org_id against the tenant configuration file.")
    )]
    TenantNotFound(String),

    #[error("Tenant '{0}' is inactive")]
    #[diagnostic(
        code(custos::domain::inactive_tenant),
        help("Set \"active\": true in the tenant entry to run its pipeline.")
    )]
    InactiveTenant(String),

    #[error("A run is already in progress for tenant '{0}'")]
    #[diagnostic(
        code(custos::domain::concurrent_run),
        help("Wait for the current cycle to finish; duplicate runs would double-crawl the partition.")
    )]
    ConcurrentRun(String),

    #[error("Invalid tenant identifier '{0}'")]
    #[diagnostic(
        code(custos::domain::invalid_identifier),
        help("org_id must match [a-z][a-z0-9_]* — it is interpolated into resource names and SQL.")
    )]
    InvalidIdentifier(String),

    #[error("Run '{0}' not found in ledger")]
    #[diagnostic(code(custos::domain::run_not_found))]
    RunNotFound(String),

    #[error("Run cancelled: {0}")]
    #[diagnostic(code(custos::domain::cancelled))]
    Cancelled(String),
}
