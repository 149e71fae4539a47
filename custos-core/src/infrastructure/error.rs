// custos-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(custos::infra::database::duckdb),
        help("An error occurred inside the local SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Local adapter) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(custos::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / JSON ---
    #[error("JSON Parsing Error: {0}")]
    #[diagnostic(
        code(custos::infra::json),
        help("Check the tenant configuration syntax (it must be a JSON array of tenant objects).")
    )]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(custos::infra::config))]
    ConfigError(String),

    #[error("Tenant configuration not found at '{0}'")]
    #[diagnostic(code(custos::infra::config_missing))]
    ConfigNotFound(String),

    // --- COLLABORATORS (transient by default, see runner retry policy) ---
    #[error("Crawler Error: {0}")]
    #[diagnostic(
        code(custos::infra::crawler),
        help("Schema discovery failed or timed out; the runner retries with backoff.")
    )]
    Crawler(String),

    #[error("Query Error: {0}")]
    #[diagnostic(
        code(custos::infra::query),
        help("The workgroup-scoped query failed; the runner retries with backoff.")
    )]
    Query(String),

    // --- ALERTING ---
    #[error("Alert Dispatch Error: {0}")]
    #[diagnostic(code(custos::infra::alert))]
    Alert(String),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
