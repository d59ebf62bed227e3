//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/readyz` - Bus connection states

use axum::{extract::State, http::StatusCode, Json};

use crate::events::BusStatus;
use crate::state::AppState;

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Used to check if the server is accepting connections.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /readyz - Publisher and subscriber connection states.
///
/// Always 200: books are served from the repository whether or not the bus
/// is reachable.
#[axum::debug_handler]
pub async fn readyz(State(state): State<AppState>) -> Json<BusStatus> {
    Json(state.bus_status())
}
