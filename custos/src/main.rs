// custos/src/main.rs

use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// Infrastructure (Config & Adapters)
use custos_core::infrastructure::adapters::{
    DuckDbQueryExecutor, FsCrawlerLauncher, TracingAlertDispatcher,
};
use custos_core::infrastructure::config::load_registry;

// Application (Use Cases)
use custos_core::application::{EXIT_CONFIG_ERROR, PipelineRunner, RunnerConfig};

// Ports (for the injection site)
use custos_core::ports::{AlertDispatcher, CrawlerLauncher, QueryExecutor};

#[derive(Parser)]
#[command(name = "custos")]
#[command(about = "Multi-tenant CUR pipeline orchestration & SLA validation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 🚀 Runs ingestion cycles (crawl -> transform -> SLA validation)
    Run {
        /// Run a single tenant (default: all active tenants)
        #[arg(long, conflicts_with = "all")]
        org_id: Option<String>,

        /// Run every active tenant (the default when --org-id is absent)
        #[arg(long)]
        all: bool,

        /// Tenant configuration file (JSON array)
        #[arg(long, env = "CUSTOS_CONFIG_PATH", default_value = "tenants.json")]
        config: PathBuf,

        /// Local query engine database file
        #[arg(long, default_value = "custos_db.duckdb")]
        db_path: String,

        /// Bound on simultaneous tenant cycles
        #[arg(long, default_value = "4")]
        max_parallel: usize,
    },

    /// ⚡ Executes a raw SQL query on the local engine (Ad-hoc)
    Query {
        sql: String,
        #[arg(long, default_value = "custos_db.duckdb")]
        db_path: String,
    },

    /// ✅ Validates the tenant configuration without running anything
    CheckConfig {
        #[arg(long, env = "CUSTOS_CONFIG_PATH", default_value = "tenants.json")]
        config: PathBuf,
    },

    /// 📋 Lists the active tenants and their derived resource names
    Tenants {
        #[arg(long, env = "CUSTOS_CONFIG_PATH", default_value = "tenants.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug custos run ... pour voir les détails
    tracing_subscriber::fmt::init();

    // 2. Environment, read once at startup (never re-read mid-run)
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
    let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string());
    info!(%environment, %region, "custos starting");

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: RUN BATCH ---
        Commands::Run {
            org_id,
            all: _,
            config,
            db_path,
            max_parallel,
        } => {
            let start = std::time::Instant::now();

            // A. Load the tenant registry (Infra). A bad file aborts the
            // whole batch before any tenant runs.
            println!("⚙️  Loading tenant configuration...");
            let registry = match load_registry(&config) {
                Ok(r) => Arc::new(r),
                Err(e) => {
                    eprintln!("💥 CONFIGURATION ERROR: {}", e);
                    std::process::exit(EXIT_CONFIG_ERROR);
                }
            };
            println!("   {} active tenant(s)", registry.active_tenants().len());

            // B. Instantiate the local adapters
            let executor: Arc<dyn QueryExecutor> = Arc::new(DuckDbQueryExecutor::new(&db_path)?);
            let mut crawler = FsCrawlerLauncher::new();
            for tenant in registry.active_tenants() {
                crawler = crawler.with_source(&tenant.crawler_id(), &tenant.source_path);
            }
            let crawler: Arc<dyn CrawlerLauncher> = Arc::new(crawler);
            let alerts: Arc<dyn AlertDispatcher> = Arc::new(TracingAlertDispatcher::new());

            // C. Run the batch (Application Layer)
            // Here is where dependency injection happens.
            let runner = PipelineRunner::new(
                Arc::clone(&registry),
                crawler,
                executor,
                alerts,
                RunnerConfig {
                    max_parallel_tenants: max_parallel,
                    ..RunnerConfig::default()
                },
            );

            // Ctrl-C stops polling and marks in-flight runs FAILED
            let shutdown = runner.shutdown_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\n🛑 Stop signal received, cancelling in-flight cycles...");
                    shutdown.shutdown();
                }
            });

            match runner.run(org_id.as_deref()).await {
                Ok(report) => {
                    print_report_table(&report);
                    println!("✨ Done in {:.2?}", start.elapsed());
                    std::process::exit(report.exit_code());
                }
                Err(e) => {
                    eprintln!("💥 BATCH ERROR: {}", e);
                    std::process::exit(EXIT_CONFIG_ERROR);
                }
            }
        }

        // --- USE CASE: AD-HOC QUERY ---
        Commands::Query { sql, db_path } => {
            let executor = DuckDbQueryExecutor::new(&db_path)?;
            match executor.execute(&sql, "adhoc", "main").await {
                Ok(rows) => {
                    for row in rows {
                        let cells: Vec<String> = row
                            .into_iter()
                            .map(|c| c.unwrap_or_else(|| "NULL".to_string()))
                            .collect();
                        println!("{}", cells.join(" | "));
                    }
                }
                Err(e) => {
                    eprintln!("❌ Query failed: {}", e);
                    std::process::exit(EXIT_CONFIG_ERROR);
                }
            }
        }

        // --- USE CASE: CONFIG VALIDATION ---
        Commands::CheckConfig { config } => match load_registry(&config) {
            Ok(registry) => {
                println!(
                    "✅ Configuration valid: {} tenant(s), {} active.",
                    registry.tenants().len(),
                    registry.active_tenants().len()
                );
            }
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(EXIT_CONFIG_ERROR);
            }
        },

        // --- USE CASE: LIST TENANTS ---
        Commands::Tenants { config } => match load_registry(&config) {
            Ok(registry) => {
                let mut table = Table::new();
                table.set_header(vec!["ORG", "GLUE DB", "WORKGROUP", "SLA (H)", "SOURCE"]);
                for tenant in registry.active_tenants() {
                    table.add_row(vec![
                        tenant.org_id.clone(),
                        tenant.glue_db.clone(),
                        tenant.athena_workgroup.clone(),
                        tenant.sla_hours.to_string(),
                        tenant.source_path.clone(),
                    ]);
                }
                println!("{table}");
            }
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(EXIT_CONFIG_ERROR);
            }
        },
    }

    Ok(())
}

fn print_report_table(report: &custos_core::application::BatchReport) {
    let mut table = Table::new();
    table.set_header(vec!["ORG", "STATUS", "SLA", "LAG (H)", "DETAIL"]);
    for outcome in &report.outcomes {
        let (sla, lag) = match &outcome.sla {
            Some(s) => (
                format!("{:?}", s.status),
                s.hours_lag.map(|l| format!("{:.1}", l)).unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };
        table.add_row(vec![
            outcome.org_id.clone(),
            format!("{:?}", outcome.status),
            sla,
            lag,
            outcome.error.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}
