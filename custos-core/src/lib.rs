// custos-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Contracts for the external collaborators (CrawlerLauncher, QueryExecutor, AlertDispatcher)
pub mod ports;

// 2. Domain (Cœur du métier)
// Tenant rules, run ledger, SLA classification.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// Config registry loading, local DuckDB / filesystem adapters.
pub mod infrastructure;

// 4. Application (Use Cases)
// Orchestration (PipelineRunner, SLAValidator, BatchReport)
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::CustosError;
