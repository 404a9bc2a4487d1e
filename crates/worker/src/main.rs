use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pillars_tracker::ProcessingTracker;
use pillars_worker::{AnalysisRunner, ChatCompletionsClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pillars_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pillars_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    pillars_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection established");

    let event_bus = Arc::new(pillars_events::EventBus::default());
    let tracker = Arc::new(ProcessingTracker::new(pool.clone(), Arc::clone(&event_bus)));
    let ai = Arc::new(ChatCompletionsClient::from_env());

    let cancel = CancellationToken::new();
    let runner = AnalysisRunner::new(pool, tracker, ai);
    let handle = tokio::spawn(runner.run(cancel.clone()));

    tracing::info!("Worker started");

    shutdown_signal().await;

    cancel.cancel();
    let _ = handle.await;
    tracing::info!("Worker stopped");
}

/// Wait for SIGINT or SIGTERM.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
