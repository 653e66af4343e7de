//! GitUploader Server - Main Entry Point
//!
//! This binary serves the upload endpoint and publishes uploads with the
//! host's `git` executable.

use std::sync::Arc;

use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gituploader_server::config::ServerConfig;
use gituploader_server::http::AppState;
use gituploader_server::upload::Publisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting GitUploader Server");
    info!("Configuration: {:?}", config);

    let config = Arc::new(config);

    // --- HTTP Server Setup ---
    let publisher = Arc::new(Publisher::with_system_git(config.clone()));
    let app_state = AppState::new(config.clone(), publisher);

    let router = gituploader_server::http::create_router(app_state);
    let http_addr = config.http_addr();

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);
    info!("Health check: http://{}/health", http_addr);
    info!("Upload endpoint: http://{}/api/upload", http_addr);

    // --- Graceful Shutdown ---
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received, starting graceful shutdown...");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
