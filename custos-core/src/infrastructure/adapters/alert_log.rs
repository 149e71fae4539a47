// custos-core/src/infrastructure/adapters/alert_log.rs

use async_trait::async_trait;
use tracing::{error, warn};

use crate::error::CustosError;
use crate::ports::alert::{AlertDispatcher, AlertEvent, AlertKind};

/// Routes alert events to the log. Delivery to a real channel (SNS,
/// Slack, ...) is a drop-in replacement behind the same port.
#[derive(Default)]
pub struct TracingAlertDispatcher;

impl TracingAlertDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertDispatcher for TracingAlertDispatcher {
    async fn notify(&self, event: AlertEvent) -> Result<(), CustosError> {
        match event.kind {
            AlertKind::RunFailed => {
                error!(org_id = %event.org_id, kind = ?event.kind, "{}", event.detail);
            }
            AlertKind::SlaBreach | AlertKind::NoData => {
                warn!(org_id = %event.org_id, kind = ?event.kind, "{}", event.detail);
            }
        }
        Ok(())
    }
}
