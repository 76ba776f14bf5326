// Object storage layer for uploaded images
//
// Handlers only see the `ObjectStore` trait; `S3Store` is the production
// implementation on top of aws-sdk-s3 (AWS S3, MinIO and other compatible
// services).

pub mod s3_client;

#[cfg(test)]
pub mod memory;

pub use s3_client::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound S3 applies to a single ListObjectsV2 page
pub const MAX_KEYS_PER_PAGE: i32 = 1000;

const MAX_EXTENSION_LEN: usize = 16;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Invalid storage request: {0}")]
    InvalidRequest(String),

    #[error("List error: {0}")]
    List(String),

    #[error("Presign error: {0}")]
    Presign(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

/// One page request against the bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: i32,
}

impl ListRequest {
    pub fn new(
        prefix: Option<String>,
        continuation_token: Option<String>,
        max_keys: Option<i32>,
    ) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()),
            continuation_token: continuation_token.filter(|t| !t.is_empty()),
            max_keys: max_keys
                .unwrap_or(MAX_KEYS_PER_PAGE)
                .clamp(1, MAX_KEYS_PER_PAGE),
        }
    }
}

/// Listing entry for a stored object
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A single page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

/// Time-limited GET URL for one object
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Key-addressed binary storage for a single bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` with the given content type
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str)
        -> Result<(), StorageError>;

    /// Fetch one page of keys
    async fn list_objects(&self, request: ListRequest) -> Result<ObjectPage, StorageError>;

    /// Sign a GET URL for `key`. The key is not required to exist.
    async fn presign_get(&self, key: &str, expires_in: Duration)
        -> Result<PresignedUrl, StorageError>;

    /// Public URL of an object, assuming a public-read bucket policy
    fn public_url(&self, key: &str) -> String;
}

/// Build a fresh object key `<prefix>/<uuid>.<ext>` for an uploaded file.
///
/// The extension is taken from the text after the last `.` in `filename` and
/// kept only when it is short and purely alphanumeric, so a crafted filename
/// cannot smuggle path segments into the key. Without a usable extension the
/// key is just `<prefix>/<uuid>`.
pub fn object_key(prefix: &str, filename: &str) -> String {
    let id = Uuid::new_v4();

    match file_extension(filename) {
        Some(ext) => format!("{}/{}.{}", prefix, id, ext),
        None => format!("{}/{}", prefix, id),
    }
}

fn file_extension(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;

    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());

    valid.then_some(ext)
}
