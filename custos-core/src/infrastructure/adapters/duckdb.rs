// custos-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::DateTime;
use duckdb::types::Value;
use duckdb::{Config, Connection};
use std::sync::{Arc, Mutex};
use tracing::debug;

// Imports Hexagonaux
use crate::error::CustosError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::query::{QueryExecutor, Row};

/// QueryExecutor over an embedded DuckDB file, for local/dev runs without
/// cloud credentials. The local engine has no workgroup isolation, so the
/// workgroup is only logged; queries arrive fully qualified
/// (`{glue_db}.{table}`), so the tenant schemas must exist in the file.
pub struct DuckDbQueryExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbQueryExecutor {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CustosError> {
        self.conn.lock().map_err(|_| {
            CustosError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "DuckDB Mutex Poisoned",
            )))
        })
    }
}

#[async_trait]
impl QueryExecutor for DuckDbQueryExecutor {
    async fn execute(
        &self,
        sql: &str,
        workgroup: &str,
        database: &str,
    ) -> Result<Vec<Row>, CustosError> {
        debug!(%workgroup, %database, "Executing query on local engine");
        let conn = self.lock()?;

        // DDL / DML statements return no rows
        if !sql.trim_start().to_uppercase().starts_with("SELECT") {
            conn.execute_batch(sql).map_err(|e| {
                CustosError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
            })?;
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(sql).map_err(|e| {
            CustosError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
        })?;

        let mut rows = stmt.query([]).map_err(|e| {
            CustosError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
        })?;

        let mut out: Vec<Row> = Vec::new();
        while let Some(row) = rows.next().map_err(|e| {
            CustosError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
        })? {
            let column_count = row.as_ref().column_count();
            let mut cells: Row = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: Value = row.get(i).map_err(|e| {
                    CustosError::Infrastructure(InfrastructureError::Database(
                        DatabaseError::DuckDB(e),
                    ))
                })?;
                cells.push(stringify(value));
            }
            out.push(cells);
        }

        Ok(out)
    }
}

// Port rows are NULL-aware strings; normalize the engine types we expect
// from CUR data (timestamps above all).
fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s),
        Value::Boolean(b) => Some(b.to_string()),
        Value::TinyInt(n) => Some(n.to_string()),
        Value::SmallInt(n) => Some(n.to_string()),
        Value::Int(n) => Some(n.to_string()),
        Value::BigInt(n) => Some(n.to_string()),
        Value::UTinyInt(n) => Some(n.to_string()),
        Value::USmallInt(n) => Some(n.to_string()),
        Value::UInt(n) => Some(n.to_string()),
        Value::UBigInt(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(f) => Some(f.to_string()),
        Value::Decimal(d) => Some(d.to_string()),
        Value::Timestamp(unit, raw) => {
            let micros = match unit {
                duckdb::types::TimeUnit::Second => raw.saturating_mul(1_000_000),
                duckdb::types::TimeUnit::Millisecond => raw.saturating_mul(1_000),
                duckdb::types::TimeUnit::Microsecond => raw,
                duckdb::types::TimeUnit::Nanosecond => raw / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        Value::Date32(days) => DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string()),
        other => Some(format!("{:?}", other)),
    }
}
