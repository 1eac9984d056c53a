use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prodshot_api::config::ServerConfig;
use prodshot_api::router::build_app_router;
use prodshot_api::state::AppState;
use prodshot_events::EventBus;
use prodshot_pipeline::{build_worker, JobQueue, Pipeline, Stores};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prodshot_api=debug,prodshot_pipeline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        embedded_worker = config.embedded_worker,
        "Loaded server configuration",
    );

    // --- Database ---
    let pool = prodshot_db::create_pool(&config.pipeline.database_url)
        .await
        .expect("Failed to open job database");
    tracing::info!("Database connection pool created");

    prodshot_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    prodshot_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Storage ---
    let stores = Stores::open(&config.pipeline)
        .await
        .expect("Failed to open storage directories");

    // --- Pipeline ---
    let queue = JobQueue::new(pool.clone());
    let event_bus = Arc::new(EventBus::default());
    let worker = if config.embedded_worker {
        Some(
            build_worker(&config.pipeline, queue.clone(), Arc::clone(&event_bus), &stores)
                .expect("Failed to build worker"),
        )
    } else {
        None
    };
    let pipeline = Pipeline::start(queue.clone(), Arc::clone(&event_bus), worker)
        .await
        .expect("Failed to start pipeline");
    tracing::info!(embedded_worker = pipeline.has_worker(), "Pipeline started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        queue,
        bridge: pipeline.bridge(),
        images: stores.images.clone(),
        logos: stores.logos.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping pipeline");
    pipeline.shutdown().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
