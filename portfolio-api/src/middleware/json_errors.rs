use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::models::ApiError;

/// Replace the empty 405 produced by method routing with a JSON error body.
///
/// The `Allow` header of the original response is carried over.
pub async fn json_method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let message = match allow.as_ref().and_then(|v| v.to_str().ok()) {
        Some(methods) => format!("Allowed methods: {}", methods),
        None => "Method not supported for this route".to_string(),
    };

    let mut json = ApiError::MethodNotAllowed(message).into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}
