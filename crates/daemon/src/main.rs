//! Drover Job Queue - Main Entry Point
//! HTTP submission surface + worker pool over one durable store.

mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use drover_api_http::{router, serve, AppState};
use drover_core::application::{SubmissionService, Worker, WorkerStop};
use drover_core::port::id_provider::UuidProvider;
use drover_core::port::time_provider::SystemTimeProvider;
use drover_core::port::{IdProvider, JobHandler, JobStore, NoopHandler, RateGate};
use drover_infra_redis::RedisRateGate;
use drover_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DATABASE_URL: &str = "sqlite://drover.db";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WORKER_COUNT: usize = 4;
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (JSON for production, pretty for development)
    let log_format = std::env::var("DROVER_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("drover=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Drover job queue v{} starting...", VERSION);

    // 1.1. Initialize OpenTelemetry (optional)
    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    // 2. Load configuration
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let worker_count: usize = std::env::var("DROVER_WORKERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WORKER_COUNT);

    info!(database_url = %database_url, "Initializing database...");

    // 3. Initialize durable store
    let pool = create_pool(&database_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool.clone(), time_provider.clone()));

    // Rate gate connects lazily and fails open while Redis is down
    let rate_gate: Arc<dyn RateGate> = Arc::new(
        RedisRateGate::new(&redis_url, time_provider.clone())
            .map_err(|e| anyhow::anyhow!("Rate gate setup failed: {}", e))?,
    );

    let handler: Arc<dyn JobHandler> = Arc::new(NoopHandler);

    let submission = Arc::new(SubmissionService::new(
        store.clone(),
        rate_gate,
        id_provider.clone(),
        time_provider.clone(),
    ));

    // 5. Start workers
    info!(worker_count = %worker_count, "Starting workers...");
    let worker_stop = WorkerStop::new();

    let mut worker_handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let worker = Worker::new(
            format!("worker-{}", id_provider.generate_id()),
            store.clone(),
            handler.clone(),
            id_provider.clone(),
            time_provider.clone(),
        );
        let stop = worker_stop.subscribe();
        worker_handles.push(tokio::spawn(async move {
            if let Err(e) = worker.run(stop).await {
                tracing::error!(error = ?e, "Worker failed");
            }
        }));
    }

    // 6. Serve HTTP until SIGINT/SIGTERM; axum drains in-flight requests
    let state = AppState {
        submission,
        store: store.clone(),
    };
    serve(port, router(state), shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e))?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Stop workers; each finishes its in-flight job first
    worker_stop.stop();
    for handle in worker_handles {
        let _ = tokio::time::timeout(WORKER_DRAIN_TIMEOUT, handle).await;
    }

    info!("Shutdown complete.");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
