//! HTTP service for managing and running test suites.
//!
//! Bodies are JSON unless the client says `application/yaml` in
//! `Content-Type` (requests) or `Accept` (responses). Result updates are
//! streamed as server-sent events.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - DTOs, content negotiation and error mapping

mod handlers;
mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use color_eyre::eyre::{Result, WrapErr};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use apitester_core::{Config, FileStorage, SuiteManager};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state for the server.
pub struct AppState {
    pub manager: SuiteManager<FileStorage>,
}

// =============================================================================
// Router
// =============================================================================

/// Builds the service routes over `state`.
pub fn router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/tests", get(handlers::list_suites).post(handlers::create_suite))
        .route(
            "/tests/{id}",
            get(handlers::get_suite)
                .put(handlers::replace_suite)
                .delete(handlers::delete_suite),
        )
        .route("/tests/{id}/run", post(handlers::run_suite))
        .route("/tests/{id}/cancel", post(handlers::cancel_run))
        .route(
            "/tests/{id}/results",
            get(handlers::get_results).post(handlers::record_result),
        )
        .route("/tests/{id}/cases/{case}/results", get(handlers::get_case_history))
        .route("/tests/{id}/events", get(handlers::suite_events))
        .route("/tests/{id}/cases/{case}/events", get(handlers::case_events))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .with_state(state)
}

// =============================================================================
// Server Entry Point
// =============================================================================

/// Start the HTTP service and run until Ctrl+C.
pub async fn start_server(config: Config) -> Result<()> {
    let manager = SuiteManager::from_config(&config)?;
    let state = Arc::new(AppState { manager });
    let app = router(state, config.server.body_limit);

    let addr = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Could not bind {}:{}", addr.0, addr.1))?;

    info!(
        addr = %listener.local_addr()?,
        data_dir = %config.storage.data_dir,
        "apitester listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("apitester stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
