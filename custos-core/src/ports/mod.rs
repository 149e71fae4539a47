// custos-core/src/ports/mod.rs

pub mod alert;
pub mod crawler;
pub mod query;

pub use alert::{AlertDispatcher, AlertEvent, AlertKind};
pub use crawler::{CrawlerHandle, CrawlerLauncher, CrawlerState};
pub use query::{QueryExecutor, Row};
