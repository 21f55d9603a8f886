//! Router assembly and the listening loop.

use crate::routes::{self, AppState};
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use icebreaker_kernel::LeadPipeline;
use icebreaker_types::IcebreakerConfig;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the API router over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let request_id = uuid::Uuid::new_v4();
        tracing::info_span!(
            "http",
            %request_id,
            method = %req.method(),
            uri = %req.uri()
        )
    });

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/process-leads", post(routes::process_lead))
        .route("/api/process-leads/batch", post(routes::process_batch))
        .layer(
            ServiceBuilder::new()
                .layer(trace)
                // The browser UI is served from another origin.
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the API on `listen_addr` until Ctrl-C.
pub async fn run_server(config: IcebreakerConfig, listen_addr: &str) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(LeadPipeline::new(config)));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(addr = %listener.local_addr()?, "Icebreaker API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Icebreaker API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
}
