// custos-core/src/ports/crawler.rs

// This port defines what the orchestrator needs from schema discovery,
// without knowing how it's done. In production the implementation drives a
// Glue crawler; in tests it is a fake.

use crate::error::CustosError;
use async_trait::async_trait;

/// Opaque handle to a started crawler job. The runner only ever polls it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlerState {
    Running,
    Succeeded,
    Failed,
}

#[async_trait]
pub trait CrawlerLauncher: Send + Sync {
    /// Kick off schema discovery for a tenant's crawler identity.
    async fn start(&self, crawler_id: &str) -> Result<CrawlerHandle, CustosError>;

    /// Non-blocking status check. The runner owns the wait/backoff loop.
    async fn poll(&self, handle: &CrawlerHandle) -> Result<CrawlerState, CustosError>;
}
