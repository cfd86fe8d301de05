//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use clinbridge_common::VERSION;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub version: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub workflow: WorkflowCheck,
}

/// Upstream workflow configuration status. No probe request is sent; the
/// upstream is opaque and every call to it is billable.
#[derive(Serialize)]
pub struct WorkflowCheck {
    pub endpoint: String,
    pub credential_loaded: bool,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - reports the configured upstream
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let credential_loaded = state.config.workflow.validate_credential().is_ok();

    Json(ReadyResponse {
        status: if credential_loaded { "ready" } else { "not_ready" }.to_string(),
        version: VERSION.to_string(),
        checks: ReadyChecks {
            workflow: WorkflowCheck {
                endpoint: state.workflow.endpoint().to_string(),
                credential_loaded,
            },
        },
    })
}
