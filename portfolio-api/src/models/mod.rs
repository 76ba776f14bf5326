pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Current database time, field names kept for existing frontend clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseTimeResponse {
    #[serde(rename = "Date")]
    pub date: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Object key the file was stored under
    pub filename: String,
    pub file_url: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListImagesQuery {
    pub prefix: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListImagesResponse {
    pub images: Vec<String>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresignQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUrlResponse {
    pub url: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}
