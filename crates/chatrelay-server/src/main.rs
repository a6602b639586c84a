//! chatrelay Server
//!
//! HTTP/SSE relay for streaming assistant chat turns.
//!
//! The server sits between chat clients and an upstream LLM API,
//! translating the provider's streaming events into one normalized
//! outward protocol with resumable delivery.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

mod app;
mod auth;
mod config;
mod routes;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "chatrelay-server")]
#[command(about = "chatrelay streaming chat backend", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Upstream LLM API base URL
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Upstream API key
    #[arg(long, env = "CHATRELAY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model served to every chat
    #[arg(short, long)]
    pub model: Option<String>,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8080")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting chatrelay server");

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    config.validate()?;
    info!("Configuration loaded successfully");
    info!("Upstream: {}", config.upstream.base_url);
    info!("Model: {}", config.upstream.model);
    info!(
        "Resumable streams: {}",
        if config.resumable.enabled { "enabled" } else { "disabled" }
    );

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Initialize application state
    info!("Initializing application state...");
    let state = app::AppState::new(config, metrics_handle)?;
    info!("Application state initialized successfully");

    // Build and run the server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("chatrelay=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatrelay=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "chatrelay_requests_total",
        "Total number of chat requests received"
    );
    metrics::describe_counter!(
        "chatrelay_request_errors_total",
        "Total number of rejected requests by error code"
    );
    metrics::describe_counter!(
        "chatrelay_turns_total",
        "Total number of assistant turns by outcome"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
