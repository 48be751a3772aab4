//! Per-resource-type teardown engines
//!
//! Each engine discovers the resources of one type owned by a cluster,
//! requests their deletion (unless dry-running) and reports what it did.
//! Engines never retry. A later cycle observes the outcome.

pub mod cache_clusters;
pub mod cache_snapshot;
pub mod error;
pub mod rds_instance;
pub mod rds_snapshot;
pub mod replication_group;
pub mod s3_bucket;

pub use cache_snapshot::CacheSnapshotEngine;
pub use error::EngineError;
pub use rds_instance::RdsInstanceEngine;
pub use rds_snapshot::RdsSnapshotEngine;
pub use replication_group::ReplicationGroupEngine;
pub use s3_bucket::S3BucketEngine;

use crate::aws::{
    AwsContext, ElasticacheApi, ElasticacheClient, FromAwsContext, RdsApi, RdsClient,
    ResourceTaggingClient, S3Api, S3Client, TagIndex, is_not_found,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teardown_common::{ReportItem, ResourceKind};
use tracing::debug;

/// Provider status shared by RDS and ElastiCache for a delete already underway
pub(crate) const STATUS_DELETING: &str = "deleting";

/// Capability every engine provides to the orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterResourceManager: Send + Sync {
    /// Stable engine name used in logs and aggregated errors
    fn name(&self) -> String;

    /// Discover resources tagged for `cluster_id` (plus any extra `tags`) and
    /// delete them, or only report them when `dry_run` is set.
    async fn delete_resources_for_cluster(
        &self,
        cluster_id: &str,
        tags: &HashMap<String, String>,
        dry_run: bool,
    ) -> Result<Vec<ReportItem>, EngineError>;
}

/// Treat a "not found" answer to a delete as the delete having already happened
pub(crate) fn ignore_not_found(result: anyhow::Result<()>, id: &str) -> anyhow::Result<()> {
    match result {
        Err(e) if is_not_found(&e) => {
            debug!(resource_id = %id, "Resource already gone");
            Ok(())
        }
        other => other,
    }
}

/// Deduplicate kinds and order them for registration
pub fn engine_order(kinds: &[ResourceKind]) -> Vec<ResourceKind> {
    let mut ordered = kinds.to_vec();
    ordered.sort_by_key(|kind| kind.teardown_priority());
    ordered.dedup();
    ordered
}

/// Build the SDK-backed engines for the given kinds, sharing one client per service.
pub fn build_engines(
    ctx: &AwsContext,
    kinds: &[ResourceKind],
    tag_key: &str,
) -> Vec<Arc<dyn ClusterResourceManager>> {
    let rds: Arc<dyn RdsApi> = Arc::new(RdsClient::from_context(ctx));
    let elasticache: Arc<dyn ElasticacheApi> = Arc::new(ElasticacheClient::from_context(ctx));
    let tag_index: Arc<dyn TagIndex> = Arc::new(ResourceTaggingClient::from_context(ctx));
    let s3: Arc<dyn S3Api> = Arc::new(S3Client::from_context(ctx));

    engine_order(kinds)
        .into_iter()
        .map(|kind| -> Arc<dyn ClusterResourceManager> {
            match kind {
                ResourceKind::RdsInstance => {
                    Arc::new(RdsInstanceEngine::new(rds.clone(), tag_key))
                }
                ResourceKind::RdsSnapshot => {
                    Arc::new(RdsSnapshotEngine::new(rds.clone(), tag_key))
                }
                ResourceKind::ElasticacheReplicationGroup => Arc::new(
                    ReplicationGroupEngine::new(elasticache.clone(), tag_index.clone(), tag_key),
                ),
                ResourceKind::ElasticacheSnapshot => Arc::new(CacheSnapshotEngine::new(
                    elasticache.clone(),
                    tag_index.clone(),
                    tag_key,
                )),
                ResourceKind::S3Bucket => Arc::new(S3BucketEngine::new(s3.clone(), tag_key)),
            }
        })
        .collect()
}
