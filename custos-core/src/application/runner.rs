// custos-core/src/application/runner.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::application::report::{BatchReport, TenantOutcome};
use crate::application::retry::RetryPolicy;
use crate::application::sla;
use crate::domain::error::DomainError;
use crate::domain::run::{RunLedger, RunStatus};
use crate::domain::sla::{SlaCheckResult, SlaStatus};
use crate::domain::tenant::TenantConfig;
use crate::error::CustosError;
use crate::infrastructure::config::ConfigRegistry;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::alert::{AlertDispatcher, AlertEvent, AlertKind};
use crate::ports::crawler::{CrawlerLauncher, CrawlerState};
use crate::ports::query::QueryExecutor;

const CRAWLER_POLL_CAP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Bound on simultaneous tenant cycles (shared quota protection,
    /// e.g. Athena workgroup concurrency limits).
    pub max_parallel_tenants: usize,
    pub retry: RetryPolicy,
    /// Initial crawler poll wait; doubles per poll, capped.
    pub crawler_poll_interval: Duration,
    /// Hard deadline on one crawler wait.
    pub crawler_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel_tenants: 4,
            retry: RetryPolicy::default(),
            crawler_poll_interval: Duration::from_secs(2),
            crawler_timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Clonable stop signal for in-flight batches. Cancelled cycles stop
/// polling and finish FAILED instead of lingering RUNNING.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// The orchestration core: drives crawl -> transform -> SLA validation per
/// tenant, isolates per-tenant failures, and records outcomes in the run
/// ledger.
///
/// Collaborators are injected ports — the runner never embeds a client.
pub struct PipelineRunner {
    registry: Arc<ConfigRegistry>,
    crawler: Arc<dyn CrawlerLauncher>,
    executor: Arc<dyn QueryExecutor>,
    alerts: Arc<dyn AlertDispatcher>,
    ledger: Arc<RunLedger>,
    config: RunnerConfig,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl PipelineRunner {
    pub fn new(
        registry: Arc<ConfigRegistry>,
        crawler: Arc<dyn CrawlerLauncher>,
        executor: Arc<dyn QueryExecutor>,
        alerts: Arc<dyn AlertDispatcher>,
        config: RunnerConfig,
    ) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            registry,
            crawler,
            executor,
            alerts,
            ledger: Arc::new(RunLedger::new()),
            config,
            cancel_tx,
            cancel_rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Run ledger snapshot (audit / idempotency checks).
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// Run one batch: all active tenants, or a single explicitly requested
    /// one.
    ///
    /// An unknown or inactive explicit target fails fast before any
    /// collaborator call. Inside the batch, failures are isolated at the
    /// tenant boundary: one tenant's fatal error never aborts the others.
    pub async fn run(&self, target: Option<&str>) -> Result<BatchReport, CustosError> {
        let started_at = Utc::now();

        let targets: Vec<TenantConfig> = match target {
            Some(org_id) => {
                let tenant = self.registry.get(org_id)?;
                if !tenant.active {
                    return Err(DomainError::InactiveTenant(org_id.to_string()).into());
                }
                vec![tenant.clone()]
            }
            // active_tenants() is already sorted by org_id
            None => self.registry.active_tenants().into_iter().cloned().collect(),
        };

        info!(tenants = targets.len(), "Starting pipeline batch");
        println!("🚀 Processing {} tenant cycle(s)...", targets.len());

        // Parallel cycles, bounded to protect shared quota. Steps inside
        // one cycle stay strictly sequential.
        let cycles = targets
            .into_iter()
            .map(|tenant| self.run_tenant_cycle(tenant));
        let stream = futures::stream::iter(cycles).buffer_unordered(self.config.max_parallel_tenants);
        let mut outcomes: Vec<TenantOutcome> = stream.collect().await;

        // buffer_unordered yields in completion order; re-sort for
        // deterministic reports
        outcomes.sort_by(|a, b| a.org_id.cmp(&b.org_id));

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        let failed = report
            .outcomes
            .iter()
            .filter(|o| o.status == RunStatus::Failed)
            .count();
        println!(
            "✨ Batch done: {} succeeded, {} failed.",
            report.outcomes.len() - failed,
            failed
        );

        Ok(report)
    }

    /// One tenant's full cycle, with its own terminal state. Never returns
    /// Err — every failure is absorbed into the outcome so the batch
    /// continues.
    async fn run_tenant_cycle(&self, tenant: TenantConfig) -> TenantOutcome {
        let org_id = tenant.org_id.clone();

        // PENDING -> RUNNING, guarded against duplicates (no side effect
        // happens on rejection)
        let run_id = match self.ledger.try_begin(&org_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(org_id = %org_id, "Cycle rejected: {}", e);
                return TenantOutcome {
                    org_id,
                    run_id: None,
                    status: RunStatus::Failed,
                    sla: None,
                    error: Some(e.to_string()),
                };
            }
        };

        println!("  🔹 [{}] cycle started", org_id);

        match self.execute_cycle(&tenant).await {
            Ok(sla_result) => {
                self.dispatch_sla_alerts(&tenant, &sla_result).await;
                // SLA_BREACH is a successful run whose result requires
                // notification, not a failure
                let detail = format!("sla={:?}", sla_result.status);
                if let Err(e) = self
                    .ledger
                    .finish(&run_id, RunStatus::Succeeded, Some(detail))
                {
                    error!(org_id = %org_id, "Ledger update failed: {}", e);
                }
                println!("    ✅ [{}] cycle succeeded ({:?})", org_id, sla_result.status);
                TenantOutcome {
                    org_id,
                    run_id: Some(run_id),
                    status: RunStatus::Succeeded,
                    sla: Some(sla_result),
                    error: None,
                }
            }
            Err(e) => {
                eprintln!("    ❌ [{}] cycle failed: {}", org_id, e);
                if let Err(le) = self
                    .ledger
                    .finish(&run_id, RunStatus::Failed, Some(e.to_string()))
                {
                    error!(org_id = %org_id, "Ledger update failed: {}", le);
                }
                self.notify(AlertEvent {
                    org_id: org_id.clone(),
                    kind: AlertKind::RunFailed,
                    detail: e.to_string(),
                })
                .await;
                TenantOutcome {
                    org_id,
                    run_id: Some(run_id),
                    status: RunStatus::Failed,
                    sla: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// crawl -> transform -> validate, each step under the bounded retry
    /// policy for transient collaborator errors.
    async fn execute_cycle(&self, tenant: &TenantConfig) -> Result<SlaCheckResult, CustosError> {
        // A. Schema discovery
        let crawler_id = tenant.crawler_id();
        self.with_retries(&tenant.org_id, "crawl", || {
            self.await_crawler(crawler_id.clone())
        })
        .await?;

        // B. Curated transformation, scoped to the tenant's workgroup/db
        let transform_sql = sla::curated_refresh_sql(tenant, Utc::now())?;
        self.with_retries(&tenant.org_id, "transform", || {
            let executor = Arc::clone(&self.executor);
            let sql = transform_sql.clone();
            let workgroup = tenant.athena_workgroup.clone();
            let database = tenant.glue_db.clone();
            async move {
                executor
                    .execute(&sql, &workgroup, &database)
                    .await
                    .map(|_| ())
            }
        })
        .await?;

        // C. Freshness validation
        self.with_retries(&tenant.org_id, "sla_check", || {
            let executor = Arc::clone(&self.executor);
            let tenant = tenant.clone();
            async move { sla::check_freshness(&*executor, &tenant, Utc::now()).await }
        })
        .await
    }

    /// Start the tenant's crawler and wait for completion: doubling poll
    /// interval, hard timeout, stop-signal aware.
    async fn await_crawler(&self, crawler_id: String) -> Result<(), CustosError> {
        self.ensure_not_cancelled()?;

        let handle = self.crawler.start(&crawler_id).await?;
        let deadline = Instant::now() + self.config.crawler_timeout;
        let mut wait = self.config.crawler_poll_interval;

        loop {
            match self.crawler.poll(&handle).await? {
                CrawlerState::Succeeded => return Ok(()),
                CrawlerState::Failed => {
                    return Err(InfrastructureError::Crawler(format!(
                        "Crawler '{}' reported FAILED",
                        crawler_id
                    ))
                    .into());
                }
                CrawlerState::Running => {
                    if Instant::now() >= deadline {
                        return Err(InfrastructureError::Crawler(format!(
                            "Crawler '{}' timed out after {:?}",
                            crawler_id, self.config.crawler_timeout
                        ))
                        .into());
                    }
                    self.sleep_or_cancel(wait).await?;
                    wait = (wait * 2).min(CRAWLER_POLL_CAP);
                }
            }
        }
    }

    async fn with_retries<T, F, Fut>(
        &self,
        org_id: &str,
        step: &str,
        mut op: F,
    ) -> Result<T, CustosError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CustosError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.retry.max_attempts => {
                    let delay = self.config.retry.compute_backoff(attempt);
                    warn!(
                        org_id,
                        step,
                        attempt,
                        max_attempts = self.config.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, will retry: {}",
                        e
                    );
                    self.sleep_or_cancel(delay).await?;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(org_id, step, attempt, "Retries exhausted: {}", e);
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn dispatch_sla_alerts(&self, tenant: &TenantConfig, result: &SlaCheckResult) {
        match result.status {
            SlaStatus::SlaBreach => {
                let detail = format!(
                    "Freshness lag {:.1}h exceeds SLA of {}h",
                    result.hours_lag.unwrap_or(f64::NAN),
                    tenant.sla_hours
                );
                println!("    ⚠️  [{}] SLA BREACH: {}", tenant.org_id, detail);
                self.notify(AlertEvent {
                    org_id: tenant.org_id.clone(),
                    kind: AlertKind::SlaBreach,
                    detail,
                })
                .await;
            }
            SlaStatus::NoData => {
                let detail = "No usage rows in the current partition".to_string();
                println!("    ⚠️  [{}] NO DATA: {}", tenant.org_id, detail);
                self.notify(AlertEvent {
                    org_id: tenant.org_id.clone(),
                    kind: AlertKind::NoData,
                    detail,
                })
                .await;
            }
            SlaStatus::Ok => {}
        }
    }

    // A lost alert must not fail an otherwise healthy run
    async fn notify(&self, event: AlertEvent) {
        if let Err(e) = self.alerts.notify(event).await {
            warn!("Alert dispatch failed: {}", e);
        }
    }

    fn ensure_not_cancelled(&self) -> Result<(), CustosError> {
        if *self.cancel_rx.borrow() {
            return Err(DomainError::Cancelled("stop signal received".into()).into());
        }
        Ok(())
    }

    /// Suspension point: waits `delay` unless the stop signal fires first.
    async fn sleep_or_cancel(&self, delay: Duration) -> Result<(), CustosError> {
        let mut rx = self.cancel_rx.clone();
        if *rx.borrow() {
            return Err(DomainError::Cancelled("stop signal received".into()).into());
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = Self::cancelled(&mut rx) => {
                Err(DomainError::Cancelled("stop signal received".into()).into())
            }
        }
    }

    async fn cancelled(rx: &mut watch::Receiver<bool>) {
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        // Sender gone without a stop signal: never resolves
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::report::{EXIT_OK, EXIT_RUN_FAILED, EXIT_SLA_BREACH};
    use crate::domain::tenant::PartitioningSpec;
    use crate::ports::crawler::CrawlerHandle;
    use crate::ports::query::Row;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    // --- FAKE COLLABORATORS ---

    #[derive(Clone)]
    enum CrawlerBehavior {
        Succeed,
        /// start() fails with a transient error this many times first
        TransientStartFailures(Arc<AtomicU32>),
        ReportFailed,
        NeverDone,
    }

    struct FakeCrawler {
        default: CrawlerBehavior,
        per_id: HashMap<String, CrawlerBehavior>,
        start_calls: Mutex<Vec<String>>,
    }

    impl FakeCrawler {
        fn succeeding() -> Self {
            Self {
                default: CrawlerBehavior::Succeed,
                per_id: HashMap::new(),
                start_calls: Mutex::new(Vec::new()),
            }
        }

        fn with_behavior(mut self, crawler_id: &str, behavior: CrawlerBehavior) -> Self {
            self.per_id.insert(crawler_id.to_string(), behavior);
            self
        }

        fn behavior_for(&self, crawler_id: &str) -> CrawlerBehavior {
            self.per_id
                .get(crawler_id)
                .cloned()
                .unwrap_or_else(|| self.default.clone())
        }

        fn starts(&self) -> Vec<String> {
            self.start_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CrawlerLauncher for FakeCrawler {
        async fn start(&self, crawler_id: &str) -> Result<CrawlerHandle, CustosError> {
            self.start_calls.lock().unwrap().push(crawler_id.to_string());
            if let CrawlerBehavior::TransientStartFailures(remaining) =
                self.behavior_for(crawler_id)
            {
                if remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err(InfrastructureError::Crawler("throttled".into()).into());
                }
            }
            Ok(CrawlerHandle(crawler_id.to_string()))
        }

        async fn poll(&self, handle: &CrawlerHandle) -> Result<CrawlerState, CustosError> {
            match self.behavior_for(&handle.0) {
                CrawlerBehavior::ReportFailed => Ok(CrawlerState::Failed),
                CrawlerBehavior::NeverDone => Ok(CrawlerState::Running),
                _ => Ok(CrawlerState::Succeeded),
            }
        }
    }

    struct FakeExecutor {
        rows: Vec<Row>,
        /// Databases whose queries fail with a transient QueryError
        fail_dbs: Vec<String>,
        rows_by_db: HashMap<String, Vec<Row>>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeExecutor {
        fn fresh() -> Self {
            let ts = (Utc::now() - ChronoDuration::hours(1))
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            Self {
                rows: vec![vec![Some(ts)]],
                fail_dbs: Vec::new(),
                rows_by_db: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_rows_for(mut self, db: &str, rows: Vec<Row>) -> Self {
            self.rows_by_db.insert(db.to_string(), rows);
            self
        }

        fn failing_for(mut self, db: &str) -> Self {
            self.fail_dbs.push(db.to_string());
            self
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryExecutor for FakeExecutor {
        async fn execute(
            &self,
            sql: &str,
            workgroup: &str,
            database: &str,
        ) -> Result<Vec<Row>, CustosError> {
            self.calls.lock().unwrap().push((
                sql.to_string(),
                workgroup.to_string(),
                database.to_string(),
            ));
            if self.fail_dbs.iter().any(|db| db == database) {
                return Err(InfrastructureError::Query("workgroup unavailable".into()).into());
            }
            Ok(self
                .rows_by_db
                .get(database)
                .cloned()
                .unwrap_or_else(|| self.rows.clone()))
        }
    }

    #[derive(Default)]
    struct FakeAlerts {
        events: Mutex<Vec<AlertEvent>>,
    }

    impl FakeAlerts {
        fn events(&self) -> Vec<AlertEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AlertDispatcher for FakeAlerts {
        async fn notify(&self, event: AlertEvent) -> Result<(), CustosError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    // --- HELPERS ---

    fn tenant(org_id: &str, active: bool, sla_hours: u32) -> TenantConfig {
        TenantConfig {
            org_id: org_id.to_string(),
            active,
            source_path: format!("s3://custos-cur/{}/", org_id),
            glue_db: TenantConfig::default_glue_db(org_id),
            athena_workgroup: TenantConfig::default_workgroup(org_id),
            sla_hours,
            partitioning: PartitioningSpec::default(),
        }
    }

    fn registry(tenants: Vec<TenantConfig>) -> Arc<ConfigRegistry> {
        Arc::new(ConfigRegistry::from_entries(tenants).unwrap())
    }

    fn fast_config() -> RunnerConfig {
        RunnerConfig {
            max_parallel_tenants: 4,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
            crawler_poll_interval: Duration::from_millis(1),
            crawler_timeout: Duration::from_secs(2),
        }
    }

    struct Harness {
        crawler: Arc<FakeCrawler>,
        executor: Arc<FakeExecutor>,
        alerts: Arc<FakeAlerts>,
        runner: PipelineRunner,
    }

    fn harness(
        tenants: Vec<TenantConfig>,
        crawler: FakeCrawler,
        executor: FakeExecutor,
    ) -> Harness {
        let crawler = Arc::new(crawler);
        let executor = Arc::new(executor);
        let alerts = Arc::new(FakeAlerts::default());
        let runner = PipelineRunner::new(
            registry(tenants),
            Arc::clone(&crawler) as Arc<dyn CrawlerLauncher>,
            Arc::clone(&executor) as Arc<dyn QueryExecutor>,
            Arc::clone(&alerts) as Arc<dyn AlertDispatcher>,
            fast_config(),
        );
        Harness {
            crawler,
            executor,
            alerts,
            runner,
        }
    }

    // --- TESTS ---

    #[tokio::test]
    async fn test_batch_success() {
        let h = harness(
            vec![tenant("tenant_beta", true, 12), tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh(),
        );

        let report = h.runner.run(None).await.unwrap();
        assert_eq!(report.outcomes.len(), 2);
        // Deterministic order by org_id
        assert_eq!(report.outcomes[0].org_id, "tenant_alpha");
        assert_eq!(report.outcomes[1].org_id, "tenant_beta");
        assert!(report.outcomes.iter().all(|o| o.status == RunStatus::Succeeded));
        assert_eq!(report.exit_code(), EXIT_OK);
        assert!(h.alerts.events().is_empty());

        // One crawl per tenant, transform + freshness query per tenant
        assert_eq!(h.crawler.starts().len(), 2);
        assert_eq!(h.executor.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        // tenant_alpha's crawler keeps reporting FAILED; tenant_beta is fine
        let h = harness(
            vec![tenant("tenant_alpha", true, 24), tenant("tenant_beta", true, 12)],
            FakeCrawler::succeeding().with_behavior(
                "crawler_custos_tenant_alpha",
                CrawlerBehavior::ReportFailed,
            ),
            FakeExecutor::fresh(),
        );

        let report = h.runner.run(None).await.unwrap();
        let alpha = &report.outcomes[0];
        let beta = &report.outcomes[1];
        assert_eq!(alpha.status, RunStatus::Failed);
        assert!(alpha.error.as_deref().unwrap().contains("FAILED"));
        assert_eq!(beta.status, RunStatus::Succeeded);
        assert_eq!(report.exit_code(), EXIT_RUN_FAILED);

        let events = h.alerts.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::RunFailed);
        assert_eq!(events[0].org_id, "tenant_alpha");
    }

    #[tokio::test]
    async fn test_query_failure_isolated_too() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24), tenant("tenant_beta", true, 12)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh().failing_for("custos_tenant_alpha_db"),
        );

        let report = h.runner.run(None).await.unwrap();
        assert_eq!(report.outcomes[0].status, RunStatus::Failed);
        assert_eq!(report.outcomes[1].status, RunStatus::Succeeded);
        assert_eq!(report.exit_code(), EXIT_RUN_FAILED);
    }

    #[tokio::test]
    async fn test_sla_breach_is_still_success() {
        let stale = (Utc::now() - ChronoDuration::hours(30))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh()
                .with_rows_for("custos_tenant_alpha_db", vec![vec![Some(stale)]]),
        );

        let report = h.runner.run(None).await.unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, RunStatus::Succeeded);
        assert_eq!(outcome.sla.as_ref().unwrap().status, SlaStatus::SlaBreach);
        assert_eq!(report.exit_code(), EXIT_SLA_BREACH);

        let events = h.alerts.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertKind::SlaBreach);
    }

    #[tokio::test]
    async fn test_no_data_alerts_but_exit_ok() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh().with_rows_for("custos_tenant_alpha_db", vec![vec![None]]),
        );

        let report = h.runner.run(None).await.unwrap();
        assert_eq!(report.outcomes[0].status, RunStatus::Succeeded);
        assert_eq!(
            report.outcomes[0].sla.as_ref().unwrap().status,
            SlaStatus::NoData
        );
        assert_eq!(report.exit_code(), EXIT_OK);
        assert_eq!(h.alerts.events()[0].kind, AlertKind::NoData);
    }

    #[tokio::test]
    async fn test_unknown_org_fails_fast_without_side_effects() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh(),
        );

        let res = h.runner.run(Some("tenant_gamma")).await;
        assert!(matches!(
            res,
            Err(CustosError::Domain(DomainError::TenantNotFound(_)))
        ));
        assert!(h.crawler.starts().is_empty());
        assert!(h.executor.calls().is_empty());
        assert!(h.runner.ledger().runs().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_org_fails_fast_without_side_effects() {
        let h = harness(
            vec![tenant("tenant_alpha", false, 24)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh(),
        );

        let res = h.runner.run(Some("tenant_alpha")).await;
        assert!(matches!(
            res,
            Err(CustosError::Domain(DomainError::InactiveTenant(_)))
        ));
        assert!(h.crawler.starts().is_empty());
        assert!(h.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_run_rejected_without_cloud_calls() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh(),
        );

        // Simulate an in-flight cycle for the same org
        let _held = h.runner.ledger().try_begin("tenant_alpha").unwrap();

        let report = h.runner.run(Some("tenant_alpha")).await.unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.error.as_deref().unwrap().contains("already in progress"));
        assert!(outcome.run_id.is_none());
        // Rejection happens before any collaborator call
        assert!(h.crawler.starts().is_empty());
        assert!(h.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transient_crawler_failures_retried() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding().with_behavior(
                "crawler_custos_tenant_alpha",
                CrawlerBehavior::TransientStartFailures(Arc::new(AtomicU32::new(2))),
            ),
            FakeExecutor::fresh(),
        );

        let report = h.runner.run(None).await.unwrap();
        assert_eq!(report.outcomes[0].status, RunStatus::Succeeded);
        // 2 throttled starts + 1 successful
        assert_eq!(h.crawler.starts().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_marks_failed() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding().with_behavior(
                "crawler_custos_tenant_alpha",
                CrawlerBehavior::TransientStartFailures(Arc::new(AtomicU32::new(10))),
            ),
            FakeExecutor::fresh(),
        );

        let report = h.runner.run(None).await.unwrap();
        assert_eq!(report.outcomes[0].status, RunStatus::Failed);
        // max_attempts bounds the start calls
        assert_eq!(h.crawler.starts().len(), 3);
        assert_eq!(h.alerts.events()[0].kind, AlertKind::RunFailed);
    }

    #[tokio::test]
    async fn test_rerun_reproduces_succeeded_outcomes() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24), tenant("tenant_beta", true, 12)],
            FakeCrawler::succeeding(),
            FakeExecutor::fresh(),
        );

        let first = h.runner.run(None).await.unwrap();
        let second = h.runner.run(None).await.unwrap();
        for (a, b) in first.outcomes.iter().zip(second.outcomes.iter()) {
            assert_eq!(a.org_id, b.org_id);
            assert_eq!(a.status, RunStatus::Succeeded);
            assert_eq!(b.status, RunStatus::Succeeded);
        }
        // Append-only ledger: both batches are retained for audit
        assert_eq!(h.runner.ledger().runs().len(), 4);
    }

    #[tokio::test]
    async fn test_cancellation_marks_run_failed() {
        let h = harness(
            vec![tenant("tenant_alpha", true, 24)],
            FakeCrawler::succeeding()
                .with_behavior("crawler_custos_tenant_alpha", CrawlerBehavior::NeverDone),
            FakeExecutor::fresh(),
        );
        let runner = Arc::new(h.runner);
        let handle = runner.shutdown_handle();

        let task = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run(None).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown();

        let report = task.await.unwrap().unwrap();
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.error.as_deref().unwrap().contains("cancelled"));

        // Not left RUNNING in the ledger
        let runs = runner.ledger().runs();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert!(!runner.ledger().is_running("tenant_alpha"));
    }
}
