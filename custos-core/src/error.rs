// custos-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustosError {
    // --- ERREURS DU DOMAINE (Tenant rules, Run guard, SLA) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (IO, Parsing, Collaborators) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- ERREURS GÉNÉRIQUES / APPLICATIVES ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for CustosError {
    fn from(err: std::io::Error) -> Self {
        CustosError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl CustosError {
    /// Collaborator failures (crawler, query engine) are transient by default
    /// and fall under the runner's bounded retry policy. Everything else is
    /// terminal for the tenant cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CustosError::Infrastructure(
                InfrastructureError::Crawler(_)
                    | InfrastructureError::Query(_)
                    | InfrastructureError::Database(_)
            )
        )
    }
}
