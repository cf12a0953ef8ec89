// services/keyspaces-demo/src/main.rs
//
// Demo client for CQL-compatible stores: resilient reads plus concurrent,
// idempotent batch inserts under a time budget.
//

mod config;
mod coordinator;
mod inserter;
mod query_runner;
#[cfg(test)]
mod testing;

use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use svckit::database::{
    DatabaseConnection, ExponentialBackoffRetryPolicy, ScyllaConnection, TracingConnectObserver,
};
use svckit::ids::TimeOrderedIdGenerator;
use svckit::metrics;

use coordinator::WorkerCoordinator;
use inserter::{BatchInsertPipeline, InsertSettings};
use query_runner::QueryRunner;

#[derive(Parser, Debug)]
#[command(name = "keyspaces-demo")]
#[command(about = "Resilient query and idempotent batch-insert demo for CQL-compatible stores")]
struct Args {
    /// Optional YAML settings file; environment variables override it
    #[arg(short, long, default_value = "config/keyspaces-demo.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyspaces_demo=info,svckit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = config::load_config(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;
    config.log_resolved();

    let retry_policy = Arc::new(ExponentialBackoffRetryPolicy::from_config(&config.retry()));
    let conn: Arc<dyn DatabaseConnection> = Arc::new(
        ScyllaConnection::new(&config.database(), retry_policy, Arc::new(TracingConnectObserver))
            .await
            .context("cluster session")?,
    );

    let runner = QueryRunner::new(conn.clone());
    let mut stdout = std::io::stdout();

    runner.run("query1", &config.query1, true, true, &mut stdout).await?;
    runner.run("query2", &config.query2, true, true, &mut stdout).await?;

    let settings = InsertSettings {
        table: config.insert_table.clone(),
        insert_limit: config.insert_limit,
        insert_duration: config.insert_duration,
        batch_capacity: config.insert_batch_size,
    };
    let summary = WorkerCoordinator::new(config.insert_concurrency)
        .run(|worker| {
            BatchInsertPipeline::new(
                worker,
                conn.clone(),
                TimeOrderedIdGenerator::new(),
                settings.clone(),
            )
            .run()
        })
        .await?;
    info!(
        "Inserted {} rows in {} batches across {} workers",
        summary.rows, summary.batches, summary.workers
    );

    runner
        .run("query3", &config.query3, config.query3_print, true, &mut stdout)
        .await?;

    debug!("Metrics:\n{}", metrics::render());
    Ok(())
}
