//! `GET /healthz` (§6): liveness plus a cheap store reachability probe.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// `get_election` on a fresh random id always returns `NotFound` against a
/// reachable store; any other error (connection failure, pool exhaustion)
/// means the store itself is unreachable, which is what "degraded" reports.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_status = match state.store.get_election(Uuid::new_v4()).await {
        Ok(_) => "ok",
        Err(voting_store::StoreError::NotFound(_)) => "ok",
        Err(_) => "degraded",
    };
    Json(HealthResponse { status: "ok", store: store_status })
}
