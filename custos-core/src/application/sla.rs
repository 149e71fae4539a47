// custos-core/src/application/sla.rs

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::domain::sla::SlaCheckResult;
use crate::domain::tenant::TenantConfig;
use crate::domain::tenant::configuration::ensure_valid_identifier;
use crate::error::CustosError;
use crate::ports::query::QueryExecutor;

/// Freshness check for one tenant: most recent usage timestamp in the raw
/// CUR table for the current year/month partition, classified against the
/// tenant's sla_hours.
///
/// Freshness is measured against tb_cur_raw, not the curated views: the
/// SLA protects the ingestion landing path, and transformation failures
/// are already surfaced as run failures.
///
/// No retries here — transient query errors propagate to the runner's
/// retry policy.
pub async fn check_freshness(
    executor: &dyn QueryExecutor,
    tenant: &TenantConfig,
    now: DateTime<Utc>,
) -> Result<SlaCheckResult, CustosError> {
    let sql = freshness_query(tenant, now)?;
    debug!(org_id = %tenant.org_id, %sql, "Running freshness query");

    let rows = executor
        .execute(&sql, &tenant.athena_workgroup, &tenant.glue_db)
        .await?;

    let last_data_point = match rows.first().and_then(|r| r.first()).and_then(|v| v.as_deref()) {
        None | Some("") => None,
        Some(raw) => Some(parse_timestamp(raw)?),
    };

    Ok(SlaCheckResult::classify(
        &tenant.org_id,
        last_data_point,
        now,
        tenant.sla_hours,
    ))
}

/// MAX(usage end) over the current partition. Identifiers are validated
/// before interpolation; the values themselves are numeric literals.
pub fn freshness_query(
    tenant: &TenantConfig,
    now: DateTime<Utc>,
) -> Result<String, CustosError> {
    ensure_valid_identifier(&tenant.org_id)?;

    let mut predicates = Vec::new();
    if tenant.partitioning.year {
        predicates.push(format!("year = '{}'", now.year()));
    }
    if tenant.partitioning.month {
        predicates.push(format!("month = '{}'", now.month()));
    }
    if tenant.partitioning.org {
        predicates.push(format!("org = '{}'", tenant.org_id));
    }

    let mut sql = format!(
        "SELECT max(line_item_usage_end_date) FROM {}.{}",
        tenant.glue_db,
        tenant.raw_table()
    );
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }
    Ok(sql)
}

/// Curated refresh executed between crawl and SLA check. The business
/// semantics of the projection live with the collaborator layer; the
/// orchestrator only guarantees partition scoping and tenant isolation.
pub fn curated_refresh_sql(
    tenant: &TenantConfig,
    now: DateTime<Utc>,
) -> Result<String, CustosError> {
    ensure_valid_identifier(&tenant.org_id)?;

    let mut sql = format!(
        "CREATE OR REPLACE VIEW {db}.vw_cur_monthly AS SELECT * FROM {db}.{table}",
        db = tenant.glue_db,
        table = tenant.raw_table()
    );
    let mut predicates = Vec::new();
    if tenant.partitioning.year {
        predicates.push(format!("year = '{}'", now.year()));
    }
    if tenant.partitioning.month {
        predicates.push(format!("month = '{}'", now.month()));
    }
    if tenant.partitioning.org {
        predicates.push(format!("org = '{}'", tenant.org_id));
    }
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }
    Ok(sql)
}

// Athena returns `YYYY-MM-DD HH:MM:SS[.fff]`; be liberal and accept
// RFC3339 and bare dates too.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CustosError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(CustosError::InternalError(format!(
        "Unparseable usage timestamp: '{}'",
        raw
    )))
}
