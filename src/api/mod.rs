//! REST API over a finished simulation run.
//!
//! - `GET /state`: next tick, report, and latest tick record
//! - `GET /telemetry`: tick records with optional range filtering
//! - `GET /networks`: one summary per network
//! - `GET /nodes/{x}/{y}/{z}`: one bank with its network members
//! - `GET|PUT /nodes/{x}/{y}/{z}/configurables`: member I/O configuration

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::routing::get;

use crate::sim::kpi::PoolReport;
use crate::sim::types::TickResult;
use crate::sim::world::World;

/// Application state shared across all request handlers.
///
/// Results and report are read-only. The world sits behind a mutex since
/// configuration updates mutate its banks.
pub struct AppState {
    pub world: Mutex<World>,
    /// Aggregate report of the run.
    pub report: PoolReport,
    /// Per-tick results of the run.
    pub results: Vec<TickResult>,
}

impl AppState {
    pub fn new(world: World, results: Vec<TickResult>) -> Self {
        Self {
            report: PoolReport::from_results(&results),
            world: Mutex::new(world),
            results,
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/networks", get(handlers::get_networks))
        .route("/nodes/{x}/{y}/{z}", get(handlers::get_node))
        .route(
            "/nodes/{x}/{y}/{z}/configurables",
            get(handlers::get_configurables).put(handlers::put_configurables),
        )
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Panics
///
/// Panics if the TCP listener cannot bind to `addr`.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| panic!("server error: {e}"));
}
