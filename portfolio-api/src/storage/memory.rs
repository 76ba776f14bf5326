// In-memory object store used by handler tests

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{ListRequest, ObjectPage, ObjectStore, ObjectSummary, PresignedUrl, StorageError};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn remove(&self, key: &str) {
        self.objects.write().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    // Continuation tokens are the last key of the previous page.
    async fn list_objects(&self, request: ListRequest) -> Result<ObjectPage, StorageError> {
        let objects = self.objects.read().await;
        let prefix = request.prefix.unwrap_or_default();
        let page_size = request.max_keys as usize;

        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| match &request.continuation_token {
                Some(token) => key.as_str() > token.as_str(),
                None => true,
            });

        let page: Vec<ObjectSummary> = matching
            .by_ref()
            .take(page_size)
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.body.len() as i64,
                last_modified: Some(Utc::now()),
            })
            .collect();

        let is_truncated = matching.next().is_some();
        let next_continuation_token = if is_truncated {
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: page,
            next_continuation_token,
            is_truncated,
        })
    }

    async fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        let lifetime = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(PresignedUrl {
            url: format!("memory://bucket/{}?expires={}", key, expires_in.as_secs()),
            expires_at: Utc::now() + lifetime,
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://bucket.example.com/{}", key)
    }
}
