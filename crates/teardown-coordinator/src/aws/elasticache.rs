//! ElastiCache cache cluster, replication group and snapshot operations

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_sdk_error;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_elasticache::Client;
use tracing::{debug, info};

/// A cache cluster node group member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheCluster {
    pub id: String,
    pub arn: String,
    pub status: String,
    pub replication_group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationGroup {
    pub id: String,
    pub arn: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub name: String,
    pub arn: Option<String>,
    pub status: String,
    pub cache_cluster_id: Option<String>,
    pub replication_group_id: Option<String>,
}

/// Trait for ElastiCache operations that can be mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ElasticacheApi: Send + Sync {
    /// List every cache cluster in the region
    async fn describe_cache_clusters(&self) -> Result<Vec<CacheCluster>>;

    /// List every replication group in the region
    async fn describe_replication_groups(&self) -> Result<Vec<ReplicationGroup>>;

    /// Delete a replication group together with its primary
    async fn delete_replication_group(&self, id: &str) -> Result<()>;

    /// List every cache snapshot in the region
    async fn describe_snapshots(&self) -> Result<Vec<CacheSnapshot>>;

    async fn delete_snapshot(&self, name: &str) -> Result<()>;
}

/// ElastiCache client backed by the AWS SDK
pub struct ElasticacheClient {
    client: Client,
}

impl FromAwsContext for ElasticacheClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.elasticache_client(),
        }
    }
}

#[async_trait]
impl ElasticacheApi for ElasticacheClient {
    async fn describe_cache_clusters(&self) -> Result<Vec<CacheCluster>> {
        let mut clusters = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_cache_clusters()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to describe cache clusters")?;

            for cluster in response.cache_clusters() {
                let (Some(id), Some(arn)) = (cluster.cache_cluster_id(), cluster.arn()) else {
                    continue;
                };
                clusters.push(CacheCluster {
                    id: id.to_string(),
                    arn: arn.to_string(),
                    status: cluster.cache_cluster_status().unwrap_or_default().to_string(),
                    replication_group_id: cluster.replication_group_id().map(str::to_string),
                });
            }

            match response.marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        debug!(count = clusters.len(), "Described cache clusters");
        Ok(clusters)
    }

    async fn describe_replication_groups(&self) -> Result<Vec<ReplicationGroup>> {
        let mut groups = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_replication_groups()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to describe replication groups")?;

            for group in response.replication_groups() {
                let Some(id) = group.replication_group_id() else {
                    continue;
                };
                groups.push(ReplicationGroup {
                    id: id.to_string(),
                    arn: group.arn().map(str::to_string),
                    status: group.status().unwrap_or_default().to_string(),
                });
            }

            match response.marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        debug!(count = groups.len(), "Described replication groups");
        Ok(groups)
    }

    async fn delete_replication_group(&self, id: &str) -> Result<()> {
        info!(replication_group = %id, "Deleting replication group");

        self.client
            .delete_replication_group()
            .replication_group_id(id)
            .retain_primary_cluster(false)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to delete replication group")?;

        Ok(())
    }

    async fn describe_snapshots(&self) -> Result<Vec<CacheSnapshot>> {
        let mut snapshots = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_snapshots()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to describe cache snapshots")?;

            for snapshot in response.snapshots() {
                let Some(name) = snapshot.snapshot_name() else {
                    continue;
                };
                snapshots.push(CacheSnapshot {
                    name: name.to_string(),
                    arn: snapshot.arn().map(str::to_string),
                    status: snapshot.snapshot_status().unwrap_or_default().to_string(),
                    cache_cluster_id: snapshot.cache_cluster_id().map(str::to_string),
                    replication_group_id: snapshot.replication_group_id().map(str::to_string),
                });
            }

            match response.marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        debug!(count = snapshots.len(), "Described cache snapshots");
        Ok(snapshots)
    }

    async fn delete_snapshot(&self, name: &str) -> Result<()> {
        info!(snapshot = %name, "Deleting cache snapshot");

        self.client
            .delete_snapshot()
            .snapshot_name(name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to delete cache snapshot")?;

        Ok(())
    }
}
