// custos-core/src/ports/alert.rs

use crate::error::CustosError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SlaBreach,
    NoData,
    RunFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub org_id: String,
    pub kind: AlertKind,
    pub detail: String,
}

#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Delivery mechanics (SNS, Slack, ...) live behind this port.
    /// A dispatch failure must never fail the tenant's run.
    async fn notify(&self, event: AlertEvent) -> Result<(), CustosError>;
}
