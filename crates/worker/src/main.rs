use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::info;

use coldchain_worker::app::{self, Command};
use coldchain_worker::config::Config;
use coldchain_worker::logging::init_logging;
use coldchain_worker::metrics::init_metrics;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let command: Command = std::env::args()
        .nth(1)
        .unwrap_or_default()
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let config = Config::load()?;
    init_logging(&config.logging);

    info!(
        command = ?command,
        "Starting cold-chain worker v{}",
        env!("CARGO_PKG_VERSION")
    );

    if config.metrics.enabled {
        let addr = config.metrics_addr()?;
        init_metrics(addr)?;
        info!("Metrics exporter listening on {}", addr);
    }

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let jobs = app::build_jobs(&config, &pool)?;

    match command {
        Command::Run => {
            let mut scheduler = app::build_scheduler(&config, &pool, jobs);
            scheduler.start();

            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");

            scheduler.shutdown();
            scheduler
                .wait_for_shutdown(config.jobs.shutdown_timeout())
                .await;
        }
        Command::Sweep => print_outcome(jobs.sweep.run_once().await?)?,
        Command::Sync => print_outcome(jobs.device_sync.run_once().await?)?,
    }

    pool.close().await;
    Ok(())
}

/// Prints a one-shot summary as JSON, or a skip marker if another worker held
/// the run lock.
fn print_outcome<T: Serialize>(summary: Option<T>) -> Result<()> {
    let output = match summary {
        Some(summary) => serde_json::to_string_pretty(&summary)?,
        None => serde_json::json!({ "skipped": true, "reason": "run lock held" }).to_string(),
    };
    println!("{}", output);
    Ok(())
}
