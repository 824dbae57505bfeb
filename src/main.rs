// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::assistant_service::AssistantService;
use crate::application::connector::TelemetryConnector;
use crate::application::controller::{ControllerState, ControllerStore};
use crate::application::history_store::{HistoryLimits, HistoryStore};
use crate::application::ingest::FrameHandler;
use crate::application::report_service::ReportService;
use crate::application::subscribers::SubscriberRegistry;
use crate::infrastructure::backend_client::HttpPlantBackend;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::ws_transport::WebSocketTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_chat, connection_status, download_report, get_controller, get_history, health_check,
    live_stream, post_chat, run_optimizer, set_plant_status, update_optimizer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_dashboard_config()?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Telemetry core, built once and shared by handle
    let history = HistoryStore::new(HistoryLimits {
        series_capacity: config.history.series_capacity,
        log_capacity: config.history.log_capacity,
    });
    let registry = SubscriberRegistry::new();
    let connector = TelemetryConnector::new(
        Arc::new(WebSocketTransport::new(config.feed.url.clone())),
        FrameHandler::new(history.clone(), registry.clone()),
        registry,
        Duration::from_millis(config.feed.reconnect_delay_ms),
    );

    // The controller state is the first subscriber; subscribing opens the feed
    let controller = ControllerStore::new(ControllerState::new(
        config.controller.chart_capacity,
        config.controller.log_capacity,
    ));
    let _controller_subscription = connector.subscribe(Arc::new(controller.clone()));

    // Backend services (application layer)
    let backend = Arc::new(HttpPlantBackend::new(
        config.backend.base_url.clone(),
        config.backend.token.clone(),
    ));
    let assistant = AssistantService::new(backend.clone(), history.clone());
    let reports = ReportService::new(backend);

    // Create application state
    let state = Arc::new(AppState {
        history,
        controller,
        connector: connector.clone(),
        assistant,
        reports,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/history", get(get_history))
        .route("/controller", get(get_controller))
        .route("/controller/plant-status", put(set_plant_status))
        .route("/connection", get(connection_status))
        .route("/live", get(live_stream))
        .route("/chat", post(post_chat).delete(clear_chat))
        .route("/optimizer", put(update_optimizer))
        .route("/optimizer/run", post(run_optimizer))
        .route("/reports/:format", get(download_report))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, feed = %config.feed.url, "starting kiln-telemetry dashboard");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            // Clearing the subscribers also ends every open /live stream
            connector.shutdown();
        })
        .await?;

    Ok(())
}
