//! ClinBridge Gateway
//!
//! The single entry point for users: serves the question form, forwards
//! submissions to the hosted workflow service, and exposes health probes.
//! Handles:
//! - Request validation
//! - Observability (logging, metrics, request ids)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use clinbridge_common::{
    config::AppConfig,
    metrics,
    workflow::{HttpWorkflowClient, WorkflowClient},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub workflow: Arc<dyn WorkflowClient>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting ClinBridge Gateway v{}", clinbridge_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // A missing or malformed credential halts startup; it must never
    // surface as a runtime error.
    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Configuration is invalid");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Full(metrics::upstream_duration_metric()),
                metrics::UPSTREAM_BUCKETS,
            )?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Build the upstream client
    let workflow: Arc<dyn WorkflowClient> =
        Arc::new(HttpWorkflowClient::new(config.workflow.clone())?);
    info!(endpoint = workflow.endpoint(), "Workflow client ready");

    // Create app state
    let state = AppState {
        config: config.clone(),
        workflow,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // The form page
        .route("/", get(handlers::page::index))

        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Ask endpoint
        .route("/v1/ask", post(handlers::ask::ask))

        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
