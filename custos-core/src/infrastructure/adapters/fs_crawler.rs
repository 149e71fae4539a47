// custos-core/src/infrastructure/adapters/fs_crawler.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::CustosError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::crawler::{CrawlerHandle, CrawlerLauncher, CrawlerState};

/// Stand-in for schema discovery on local runs: "crawling" a tenant means
/// scanning its source directory for landed CUR files. A missing or empty
/// directory is a failed crawl, mirroring a crawler with nothing to
/// catalog.
#[derive(Default)]
pub struct FsCrawlerLauncher {
    sources: HashMap<String, PathBuf>,
    states: Mutex<HashMap<String, CrawlerState>>,
    seq: AtomicU64,
}

impl FsCrawlerLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the directory a crawler identity scans.
    pub fn with_source(mut self, crawler_id: &str, path: impl Into<PathBuf>) -> Self {
        self.sources.insert(crawler_id.to_string(), path.into());
        self
    }

    fn scan(&self, crawler_id: &str) -> CrawlerState {
        let Some(root) = self.sources.get(crawler_id) else {
            warn!(crawler_id, "No source registered for crawler");
            return CrawlerState::Failed;
        };
        if !root.exists() {
            warn!(crawler_id, path = ?root, "Source path does not exist");
            return CrawlerState::Failed;
        }

        let files = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .count();

        info!(crawler_id, files, "Source scan complete");
        if files == 0 {
            CrawlerState::Failed
        } else {
            CrawlerState::Succeeded
        }
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<String, CrawlerState>> {
        match self.states.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl CrawlerLauncher for FsCrawlerLauncher {
    async fn start(&self, crawler_id: &str) -> Result<CrawlerHandle, CustosError> {
        if !self.sources.contains_key(crawler_id) {
            return Err(InfrastructureError::Crawler(format!(
                "Unknown crawler identity '{}'",
                crawler_id
            ))
            .into());
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let handle_id = format!("{}#{}", crawler_id, seq);

        // The scan is cheap enough to run inline; the terminal state is
        // visible from the first poll.
        let state = self.scan(crawler_id);
        self.lock_states().insert(handle_id.clone(), state);

        Ok(CrawlerHandle(handle_id))
    }

    async fn poll(&self, handle: &CrawlerHandle) -> Result<CrawlerState, CustosError> {
        self.lock_states().get(&handle.0).copied().ok_or_else(|| {
            InfrastructureError::Crawler(format!("Unknown crawler handle '{}'", handle.0)).into()
        })
    }
}
