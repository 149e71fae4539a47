// custos-core/src/domain/sla.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlaStatus {
    Ok,
    SlaBreach,
    NoData,
}

/// Immutable freshness verdict for one tenant cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaCheckResult {
    pub org_id: String,
    pub last_data_point: Option<DateTime<Utc>>,
    pub hours_lag: Option<f64>,
    pub status: SlaStatus,
}

impl SlaCheckResult {
    /// Classify freshness against the tenant threshold.
    ///
    /// The boundary is exclusive: a lag exactly equal to sla_hours is Ok,
    /// only a strictly greater lag is a breach.
    pub fn classify(
        org_id: &str,
        last_data_point: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        sla_hours: u32,
    ) -> Self {
        match last_data_point {
            None => Self {
                org_id: org_id.to_string(),
                last_data_point: None,
                hours_lag: None,
                status: SlaStatus::NoData,
            },
            Some(ts) => {
                // Clock skew can put the landing timestamp slightly in the
                // future; lag is defined non-negative.
                let hours_lag = ((now - ts).num_seconds().max(0) as f64) / 3600.0;
                let status = if hours_lag > f64::from(sla_hours) {
                    SlaStatus::SlaBreach
                } else {
                    SlaStatus::Ok
                };
                Self {
                    org_id: org_id.to_string(),
                    last_data_point: Some(ts),
                    hours_lag: Some(hours_lag),
                    status,
                }
            }
        }
    }
}
