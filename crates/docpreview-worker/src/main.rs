//! Docpreview worker binary.
//!
//! Connects to Postgres, runs migrations, wires the storage backend, the
//! legacy converter and the renderer client into the pipeline orchestrator,
//! and consumes the conversion job queue until SIGINT/SIGTERM.

mod worker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use docpreview_convert::{LegacyConverter, PreviewOrchestrator, RendererClient};
use docpreview_core::{Config, StatusReporter};
use docpreview_db::{JobQueueRepository, PreviewRepository};
use docpreview_storage::create_storage;

use crate::worker::{JobWorker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,docpreview=debug")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("../docpreview-db/migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;

    let queue = JobQueueRepository::new(pool.clone());
    let reporter: Arc<dyn StatusReporter> = Arc::new(PreviewRepository::new(pool.clone()));
    let converter = LegacyConverter::new(config.soffice_path.clone());
    let renderer = RendererClient::new(config.renderer_base_url.clone())?;

    let orchestrator = Arc::new(PreviewOrchestrator::new(
        storage, reporter, converter, renderer,
    ));

    let worker = JobWorker::start(
        queue,
        orchestrator,
        WorkerConfig {
            max_workers: config.max_concurrent_jobs,
            poll_interval_ms: config.poll_interval_ms,
        },
        pool,
    );

    shutdown_signal().await;
    worker.shutdown().await;
    tracing::info!("Worker exited cleanly");

    Ok(())
}

/// Wait for Ctrl+C (SIGINT) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
