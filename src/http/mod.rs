//! HTTP surface over a shared [`Workspace`]

pub mod errors;
pub mod handlers;


use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::session::Workspace;

pub use errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
}

/// All routes with permissive CORS, request tracing and a body limit
#[inline]
pub fn router(workspace: Arc<Workspace>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/documents", post(handlers::upload_document))
        .route("/extract_pdf_text/", post(handlers::upload_document))
        .route("/ask", post(handlers::ask))
        .route("/search", post(handlers::search))
        .route("/due-diligence/summary", get(handlers::summary))
        .route("/due-diligence/report", get(handlers::report))
        .route("/session", delete(handlers::reset))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { workspace })
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let workspace = Arc::new(Workspace::from_config(config)?);
    let app = router(Arc::clone(&workspace), config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Workspace {} listening on http://{}", workspace.id(), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
