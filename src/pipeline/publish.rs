//! Report publishing: store the rendered PDF and mint a time-limited link.
//!
//! Keys are `annotated_contracts/{unix_millis}_{uuid}_annotated_contract.pdf`.
//! The random component makes keys unique across concurrent runs, so two
//! requests never overwrite each other even within the same millisecond.
//!
//! A write followed by a failed signing leaves the object in the bucket
//! with no link pointing to it. It is not deleted; the failure is logged with
//! the key so the object can be found later.

use crate::config::{StorageSettings, ARTIFACT_PREFIX};
use crate::error::ReviewError;
use crate::model::{PublishedArtifact, RenderedArtifact};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Failure reported by an [`ArtifactStore`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Object storage with signed read links.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` under `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError>;

    /// A URL granting read access to `key` from `issued_at` for `ttl`.
    async fn presign(
        &self,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, StoreError>;
}

/// S3 (or S3-compatible) bucket.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
}

impl S3ArtifactStore {
    /// Create a client from `settings` and probe the bucket.
    ///
    /// An unreachable bucket is only logged: credentials may be scoped to
    /// object writes without `HeadBucket`.
    pub async fn connect(settings: &StorageSettings) -> Result<Self, ReviewError> {
        settings.validate()?;

        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "contract-review",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint {
            // MinIO and most S3-compatible stores need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        let bucket = settings.bucket.clone();

        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => info!(%bucket, "Connected to report bucket"),
            Err(e) => warn!(%bucket, error = %e, "Could not verify bucket, continuing"),
        }

        Ok(Self { client, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .cache_control("no-cache")
            .send()
            .await
            .map_err(|e| StoreError(format!("put_object failed: {e}")))?;
        Ok(())
    }

    async fn presign(
        &self,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let config = PresigningConfig::builder()
            .start_time(SystemTime::from(issued_at))
            .expires_in(ttl)
            .build()
            .map_err(|e| StoreError(format!("invalid signing lifetime: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| StoreError(format!("presigning failed: {e}")))?;

        Ok(request.uri().to_string())
    }
}

/// Storage key for an artifact published at `now`.
pub fn storage_key(now: DateTime<Utc>) -> String {
    format!(
        "{ARTIFACT_PREFIX}{}_{}_annotated_contract.pdf",
        now.timestamp_millis(),
        Uuid::new_v4()
    )
}

/// Writes rendered reports and returns their signed links.
#[derive(Clone)]
pub struct ArtifactPublisher {
    store: Arc<dyn ArtifactStore>,
    ttl: Duration,
}

impl ArtifactPublisher {
    pub fn new(store: Arc<dyn ArtifactStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `artifact` under a fresh key and sign a read URL for it.
    ///
    /// The URL is signed as of `published_at`, so `expires_at` is exactly the
    /// URL's own expiry. Signatures carry whole seconds, hence the truncation.
    pub async fn publish(
        &self,
        artifact: RenderedArtifact,
    ) -> Result<PublishedArtifact, ReviewError> {
        let now = Utc::now();
        let key = storage_key(now);
        let published_at = now.trunc_subsecs(0);
        let size = artifact.bytes.len();

        self.store
            .put(&key, artifact.bytes, RenderedArtifact::CONTENT_TYPE)
            .await
            .map_err(|e| ReviewError::Upload {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        info!(%key, bytes = size, "Report stored");

        let signed_url = match self.store.presign(&key, published_at, self.ttl).await {
            Ok(url) => url,
            Err(e) => {
                warn!(%key, error = %e, "Signing failed, stored report is orphaned");
                return Err(ReviewError::Signing {
                    key,
                    reason: e.to_string(),
                });
            }
        };

        let expires_at = published_at + chrono::Duration::seconds(self.ttl.as_secs() as i64);

        Ok(PublishedArtifact {
            storage_key: key,
            signed_url,
            published_at,
            expires_at,
        })
    }
}
