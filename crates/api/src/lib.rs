pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use common::CycleStatus;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    /// Most recent completed cycle, written by the scheduler.
    pub last_cycle: Arc<RwLock<Option<CycleStatus>>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Build and run the liveness server.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Liveness endpoint listening");
    axum::serve(listener, router(state)).await
}
