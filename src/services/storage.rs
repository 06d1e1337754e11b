use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

/// Where an uploaded payload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, data: Bytes, content_type: &str, filename: &str) -> Result<StoredObject>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Key under which a payload named `filename` is stored. Only the last path
/// segment of the name is kept, with anything outside `[A-Za-z0-9._-]`
/// replaced, so the key is also a valid URL path.
pub fn object_key(filename: &str) -> String {
    format!("items/{}-{}", Uuid::new_v4(), key_safe_name(filename))
}

fn key_safe_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let name: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        name
    }
}

/// Best-effort delete: runs in the background, logs the outcome, never retries.
pub fn spawn_delete(store: Arc<dyn ObjectStore>, key: String) {
    tokio::spawn(async move {
        match store.delete(&key).await {
            Ok(()) => tracing::debug!("🗑️  Deleted object {}", key),
            Err(e) => tracing::warn!("Failed to delete object {}: {}", key, e),
        }
    });
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, data: Bytes, content_type: &str, filename: &str) -> Result<StoredObject> {
        let key = object_key(filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .body(ByteStream::from(data))
            .send()
            .await?;

        Ok(StoredObject {
            url: self.url_for(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }
}
