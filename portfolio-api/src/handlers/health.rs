use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::models::{MessageResponse, RootResponse};
use crate::AppState;

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Deployment status
///
/// GET /
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Deployment Successful!".to_string(),
        status: "running".to_string(),
        timestamp: Utc::now(),
        origin: state.config.cors.frontend_domain.clone(),
    })
}

/// GET /api/hello
pub async fn hello() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello from the backend!".to_string(),
    })
}
