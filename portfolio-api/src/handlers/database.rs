use axum::{extract::State, Json};
use tracing::{error, info};

use crate::models::{ApiResult, DatabaseTimeResponse};
use crate::AppState;

/// Current timestamp as reported by the database server
///
/// GET /api/data
pub async fn get_data(State(state): State<AppState>) -> ApiResult<Json<DatabaseTimeResponse>> {
    let now = state.db.current_time().await.map_err(|e| {
        error!("Database time query failed: {}", e);
        e
    })?;

    info!(database_time = %now, "Database time query completed");

    Ok(Json(DatabaseTimeResponse {
        date: now,
        message: "Hello from the database!".to_string(),
    }))
}
