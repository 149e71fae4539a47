// custos-core/src/infrastructure/adapters/mod.rs

// Local/dev implementations of the ports. Production deployments plug in
// their own Glue/Athena/SNS-backed implementations through the same traits.

pub mod alert_log;
pub mod duckdb;
pub mod fs_crawler;

pub use alert_log::TracingAlertDispatcher;
pub use duckdb::DuckDbQueryExecutor;
pub use fs_crawler::FsCrawlerLauncher;
