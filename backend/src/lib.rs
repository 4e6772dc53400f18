pub mod api;
pub mod automation;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use api::AppState;
pub use error::{PilotError, PilotResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/start", post(api::post_start))
        .route("/api/stop", post(api::post_stop))
        .route("/api/status", get(api::get_status))
        .route("/api/settings", get(api::get_settings).post(api::post_settings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> PilotResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "control API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
