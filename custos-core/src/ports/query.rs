// custos-core/src/ports/query.rs

use crate::error::CustosError;
use async_trait::async_trait;

/// One result row, column values as optional strings (NULL-aware).
pub type Row = Vec<Option<String>>;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query scoped to a tenant's isolated workgroup and database.
    /// The caller has already validated every identifier interpolated
    /// into `sql` (see TenantConfig), so adapters can pass it through.
    async fn execute(
        &self,
        sql: &str,
        workgroup: &str,
        database: &str,
    ) -> Result<Vec<Row>, CustosError>;
}
