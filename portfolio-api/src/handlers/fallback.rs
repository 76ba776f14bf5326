use axum::http::Uri;

use crate::models::ApiError;

/// JSON 404 for any path no route matches
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
