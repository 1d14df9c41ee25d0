//! Server setup and routing.

use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;

use crate::app_state::AppState;

mod cookie;
mod prompts;

pub use cookie::SESSION_COOKIE;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(prompts::show).post(prompts::submit))
        .route("/prompts", get(prompts::show).post(prompts::submit))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run the HTTP server.
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[http] listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
