//! Standalone worker process.
//!
//! Consumes the job queue shared with the API server through the SQLite
//! database file. Run the API with `EMBEDDED_WORKER=false` when using this.

use std::sync::Arc;

use anyhow::Context;
use prodshot_events::EventBus;
use prodshot_pipeline::{build_worker, JobQueue, Pipeline, PipelineConfig, Stores};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prodshot_worker=debug,prodshot_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env()?;
    tracing::info!(
        database_url = %config.database_url,
        image_dir = %config.image_dir.display(),
        "Loaded pipeline configuration",
    );

    // --- Database ---
    let pool = prodshot_db::create_pool(&config.database_url)
        .await
        .context("Failed to open job database")?;
    prodshot_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    prodshot_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Pipeline ---
    let stores = Stores::open(&config)
        .await
        .context("Failed to open storage directories")?;
    let queue = JobQueue::new(pool);
    let bus = Arc::new(EventBus::default());
    let worker = build_worker(&config, queue.clone(), bus.clone(), &stores)?;
    let pipeline = Pipeline::start(queue, bus, Some(worker)).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl-C handler")?;
    tracing::info!("Received Ctrl-C, finishing the current job");

    pipeline.shutdown().await;
    Ok(())
}
