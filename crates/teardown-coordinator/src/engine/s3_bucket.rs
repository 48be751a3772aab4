//! S3 bucket engine

use super::{ClusterResourceManager, EngineError, ignore_not_found};
use crate::aws::{S3Api, is_not_found, is_wrong_region};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teardown_common::{ClusterSelector, ReportItem, ResourceKind};
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::S3Bucket;

/// Empties and deletes the cluster's buckets.
pub struct S3BucketEngine {
    s3: Arc<dyn S3Api>,
    tag_key: String,
}

/// Bucket names are global, so the ARN carries no region or account
pub fn bucket_arn(name: &str) -> String {
    format!("arn:aws:s3:::{name}")
}

impl S3BucketEngine {
    pub fn new(s3: Arc<dyn S3Api>, tag_key: impl Into<String>) -> Self {
        Self {
            s3,
            tag_key: tag_key.into(),
        }
    }

    async fn empty_and_delete(&self, bucket: &str) -> anyhow::Result<()> {
        let removed = self.s3.empty_bucket(bucket).await?;
        debug!(bucket = %bucket, removed, "Bucket emptied");
        self.s3.delete_bucket(bucket).await
    }
}

#[async_trait]
impl ClusterResourceManager for S3BucketEngine {
    fn name(&self) -> String {
        KIND.as_str().to_string()
    }

    async fn delete_resources_for_cluster(
        &self,
        cluster_id: &str,
        tags: &HashMap<String, String>,
        dry_run: bool,
    ) -> Result<Vec<ReportItem>, EngineError> {
        let selector = ClusterSelector::new(&self.tag_key, cluster_id, tags);

        let buckets = self
            .s3
            .list_buckets()
            .await
            .map_err(|source| EngineError::Describe {
                what: "buckets",
                source,
            })?;

        let mut owned = Vec::new();
        for bucket in buckets {
            let bucket_tags = match self.s3.get_bucket_tags(&bucket.name).await {
                Ok(tags) => tags,
                // Deleted since listing, or owned by another region's endpoint
                Err(e) if is_not_found(&e) || is_wrong_region(&e) => {
                    debug!(bucket = %bucket.name, error = %e, "Skipping bucket");
                    continue;
                }
                Err(source) => {
                    return Err(EngineError::DescribeTags {
                        what: KIND.description(),
                        id: bucket.name,
                        source,
                    });
                }
            };
            if selector.matches(&bucket_tags) {
                owned.push(bucket);
            }
        }
        debug!(engine = KIND.as_str(), cluster_id, count = owned.len(), "Found cluster buckets");

        let mut items = Vec::with_capacity(owned.len());
        for bucket in owned {
            if dry_run {
                info!(resource_id = %bucket.name, "[DRY RUN] Would empty and delete bucket");
            } else {
                ignore_not_found(self.empty_and_delete(&bucket.name).await, &bucket.name)
                    .map_err(|source| EngineError::Delete {
                        what: KIND.description(),
                        id: bucket.name.clone(),
                        source,
                    })?;
            }
            items.push(ReportItem::planned_delete(
                bucket_arn(&bucket.name),
                &bucket.name,
                dry_run,
            ));
        }

        Ok(items)
    }
}
