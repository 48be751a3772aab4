//! S3 bucket discovery and removal

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_sdk_error;
use crate::aws::tags::extract_s3_tags;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use std::collections::HashMap;
use teardown_common::defaults::S3_DELETE_BATCH_SIZE;
use tracing::{debug, info};

/// Error code S3 returns for a bucket that has never been tagged
const NO_SUCH_TAG_SET: &str = "NoSuchTagSet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
}

/// Trait for S3 operations that can be mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait S3Api: Send + Sync {
    /// List every bucket owned by the account
    async fn list_buckets(&self) -> Result<Vec<Bucket>>;

    /// Get a bucket's tags; an untagged bucket yields an empty map
    async fn get_bucket_tags(&self, bucket: &str) -> Result<HashMap<String, String>>;

    /// Delete every object version and delete marker, returning how many were removed
    async fn empty_bucket(&self, bucket: &str) -> Result<usize>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// S3 client backed by the AWS SDK
pub struct S3Client {
    client: Client,
}

impl FromAwsContext for S3Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
        }
    }
}

impl S3Client {
    async fn delete_batch(&self, bucket: &str, batch: Vec<ObjectIdentifier>) -> Result<()> {
        let delete = Delete::builder()
            .set_objects(Some(batch))
            .quiet(true)
            .build()
            .context("Failed to build delete request")?;

        let response = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to delete objects")?;

        if let Some(failed) = response.errors().first() {
            anyhow::bail!(
                "Failed to delete {} object(s), first was '{}': {} ({})",
                response.errors().len(),
                failed.key().unwrap_or_default(),
                failed.message().unwrap_or("unknown error"),
                failed.code().unwrap_or("no code"),
            );
        }

        Ok(())
    }
}

#[async_trait]
impl S3Api for S3Client {
    async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let mut buckets = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_buckets()
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to list buckets")?;

            buckets.extend(response.buckets().iter().filter_map(|b| {
                b.name().map(|name| Bucket {
                    name: name.to_string(),
                })
            }));

            match response.continuation_token() {
                Some(token) if !token.is_empty() => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(count = buckets.len(), "Listed buckets");
        Ok(buckets)
    }

    async fn get_bucket_tags(&self, bucket: &str) -> Result<HashMap<String, String>> {
        match self.client.get_bucket_tagging().bucket(bucket).send().await {
            Ok(response) => Ok(extract_s3_tags(response.tag_set())),
            Err(e) if e.code() == Some(NO_SUCH_TAG_SET) => Ok(HashMap::new()),
            Err(e) => Err(classify_sdk_error(&e)).context("Failed to get bucket tagging"),
        }
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<usize> {
        info!(bucket = %bucket, "Emptying bucket");

        let mut removed = 0;
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let response = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_id_marker.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to list object versions")?;

            let versions = response
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()));
            let markers = response
                .delete_markers()
                .iter()
                .map(|m| (m.key(), m.version_id()));

            let mut objects = Vec::new();
            for (key, version_id) in versions.chain(markers) {
                let Some(key) = key else { continue };
                objects.push(
                    ObjectIdentifier::builder()
                        .key(key)
                        .set_version_id(version_id.map(str::to_string))
                        .build()
                        .context("Failed to build object identifier")?,
                );
            }

            while !objects.is_empty() {
                let rest = objects.split_off(objects.len().min(S3_DELETE_BATCH_SIZE));
                let batch = std::mem::replace(&mut objects, rest);
                let count = batch.len();
                self.delete_batch(bucket, batch).await?;
                removed += count;
                debug!(bucket = %bucket, count, "Deleted object batch");
            }

            if response.is_truncated() == Some(true) {
                key_marker = response.next_key_marker().map(str::to_string);
                version_id_marker = response.next_version_id_marker().map(str::to_string);
            } else {
                break;
            }
        }

        Ok(removed)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        info!(bucket = %bucket, "Deleting bucket");

        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to delete bucket")?;

        Ok(())
    }
}
