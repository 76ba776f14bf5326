// S3/MinIO client implementation

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use super::{ListRequest, ObjectPage, ObjectStore, ObjectSummary, PresignedUrl, StorageError};
use crate::config::StorageConfig;

/// Object store backed by an S3 bucket
pub struct S3Store {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
    public_base_url: Option<String>,
}

impl S3Store {
    /// Build the client from configuration.
    ///
    /// Static keys are used when configured, otherwise the AWS default
    /// credential chain (environment, profile, instance role) applies.
    pub async fn new(config: &StorageConfig) -> Self {
        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Initializing S3 client"
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "portfolio-api",
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            info!(s3_endpoint = %endpoint, "Using custom S3-compatible endpoint");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            endpoint: config.endpoint.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        debug!("Uploading object to S3: {} ({} bytes)", key, body.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn list_objects(&self, request: ListRequest) -> Result<ObjectPage, StorageError> {
        debug!(
            prefix = ?request.prefix,
            max_keys = request.max_keys,
            "Listing objects"
        );

        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(request.prefix)
            .set_continuation_token(request.continuation_token)
            .max_keys(request.max_keys)
            .send()
            .await
            .map_err(|e| {
                let code = e.as_service_error().and_then(|se| se.code()).map(str::to_string);
                list_error(code.as_deref(), DisplayErrorContext(&e).to_string())
            })?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(ObjectSummary {
                    key: key.to_string(),
                    size: object.size().unwrap_or_default(),
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
                })
            })
            .collect();

        Ok(ObjectPage {
            objects,
            next_continuation_token: output.next_continuation_token().map(str::to_string),
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        let issued_at = SystemTime::now();

        let presigning = PresigningConfig::builder()
            .start_time(issued_at)
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(DisplayErrorContext(&e).to_string()))?;

        let lifetime =
            chrono::Duration::from_std(expires_in).map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at: DateTime::<Utc>::from(issued_at) + lifetime,
        })
    }

    fn public_url(&self, key: &str) -> String {
        match (&self.public_base_url, &self.endpoint) {
            (Some(base), _) => format!("{}/{}", base.trim_end_matches('/'), key),
            (None, Some(endpoint)) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                key
            ),
            (None, None) => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}

/// S3 answers a malformed or expired continuation token with `InvalidArgument`,
/// which is the caller's fault rather than an outage.
fn list_error(code: Option<&str>, message: String) -> StorageError {
    match code {
        Some("InvalidArgument") => StorageError::InvalidRequest(message),
        _ => StorageError::List(message),
    }
}
