use axum::{
    routing::get,
    Router,
};

use crate::handlers::{database, files};
use crate::AppState;

/// Versioned, resource-style routes mounted under `/v1`
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/time", get(database::get_data))
        .route("/images", get(files::list_images).post(files::upload_file))
        .route("/images/presign", get(files::generate_presigned_url))
}
