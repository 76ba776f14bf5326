use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection,
        Multipart, Query, State,
    },
    Json,
};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::models::{
    ApiError, ApiResult, ListImagesQuery, ListImagesResponse, PresignQuery, PresignedUrlResponse,
    UploadResponse,
};
use crate::storage::{object_key, ListRequest};
use crate::AppState;

const FILE_FIELD: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Store an uploaded file under a fresh key
///
/// POST /api/upload (multipart form, field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field: {:?}", field.name());
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Field 'file' must be a file part".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await?;

        upload = Some((filename, content_type, data));
        break;
    }

    let (filename, content_type, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let key = object_key(&state.config.storage.key_prefix, &filename);
    let size = data.len();

    state
        .storage
        .put_object(&key, data, &content_type)
        .await
        .map_err(|e| {
            error!("Failed to upload file to object storage: {}", e);
            e
        })?;

    info!(
        key = %key,
        size,
        content_type = %content_type,
        "File uploaded successfully"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file_url: state.storage.public_url(&key),
        filename: key,
        content_type,
        size,
    }))
}

/// One page of stored object keys
///
/// GET /api/list-images?prefix=&continuation_token=&max_keys=
pub async fn list_images(
    State(state): State<AppState>,
    query: Result<Query<ListImagesQuery>, QueryRejection>,
) -> ApiResult<Json<ListImagesResponse>> {
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = ListRequest::new(params.prefix, params.continuation_token, params.max_keys);

    let page = state.storage.list_objects(request).await.map_err(|e| {
        error!("Failed to list images: {}", e);
        e
    })?;

    debug!(
        count = page.objects.len(),
        truncated = page.is_truncated,
        "Listed images"
    );

    Ok(Json(ListImagesResponse {
        images: page.objects.into_iter().map(|o| o.key).collect(),
        next_continuation_token: page.next_continuation_token,
        is_truncated: page.is_truncated,
    }))
}

/// Time-limited download URL for any key in the bucket
///
/// GET /api/generate-presigned-url?filename=
pub async fn generate_presigned_url(
    State(state): State<AppState>,
    query: Result<Query<PresignQuery>, QueryRejection>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let key = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'filename' is required".to_string()))?;

    let expires_in = state.config.storage.presign_expiry_secs;
    let presigned = state
        .storage
        .presign_get(&key, Duration::from_secs(expires_in))
        .await
        .map_err(|e| {
            error!("Presigned URL generation failed for {}: {}", key, e);
            e
        })?;

    debug!(key = %key, expires_at = %presigned.expires_at, "Presigned URL generated");

    Ok(Json(PresignedUrlResponse {
        url: presigned.url,
        expires_in,
        expires_at: presigned.expires_at,
    }))
}
