//! ElastiCache snapshot engine

use super::cache_clusters::owned_cache_clusters;
use super::{ClusterResourceManager, EngineError, STATUS_DELETING, ignore_not_found};
use crate::aws::elasticache::CacheSnapshot;
use crate::aws::tags::CACHE_SNAPSHOT_RESOURCE_TYPE;
use crate::aws::{ElasticacheApi, TagIndex};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use teardown_common::{ClusterSelector, ReportItem, ResourceKind};
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::ElasticacheSnapshot;

/// Deletes cache snapshots that are tagged for the cluster or were taken
/// from one of its cache clusters or replication groups.
///
/// Tagged snapshots are still found after their source nodes are gone.
pub struct CacheSnapshotEngine {
    elasticache: Arc<dyn ElasticacheApi>,
    tag_index: Arc<dyn TagIndex>,
    tag_key: String,
}

/// Everything that marks a snapshot as belonging to the cluster
#[derive(Default)]
struct Owners {
    snapshot_arns: HashSet<String>,
    cache_cluster_ids: HashSet<String>,
    replication_group_ids: HashSet<String>,
}

impl Owners {
    fn is_empty(&self) -> bool {
        self.snapshot_arns.is_empty()
            && self.cache_cluster_ids.is_empty()
            && self.replication_group_ids.is_empty()
    }

    fn owns(&self, snapshot: &CacheSnapshot) -> bool {
        snapshot
            .arn
            .as_ref()
            .is_some_and(|arn| self.snapshot_arns.contains(arn))
            || snapshot
                .cache_cluster_id
                .as_ref()
                .is_some_and(|id| self.cache_cluster_ids.contains(id))
            || snapshot
                .replication_group_id
                .as_ref()
                .is_some_and(|id| self.replication_group_ids.contains(id))
    }
}

impl CacheSnapshotEngine {
    pub fn new(
        elasticache: Arc<dyn ElasticacheApi>,
        tag_index: Arc<dyn TagIndex>,
        tag_key: impl Into<String>,
    ) -> Self {
        Self {
            elasticache,
            tag_index,
            tag_key: tag_key.into(),
        }
    }

    async fn owners(&self, selector: &ClusterSelector) -> Result<Owners, EngineError> {
        let mut owners = Owners::default();

        for cluster in
            owned_cache_clusters(self.tag_index.as_ref(), self.elasticache.as_ref(), selector)
                .await?
        {
            if let Some(group) = cluster.replication_group_id {
                owners.replication_group_ids.insert(group);
            }
            owners.cache_cluster_ids.insert(cluster.id);
        }

        owners.snapshot_arns = self
            .tag_index
            .get_resources_by_tags(CACHE_SNAPSHOT_RESOURCE_TYPE, &selector.required_tags())
            .await
            .map_err(|source| EngineError::Describe {
                what: "tagged cache snapshots",
                source,
            })?
            .into_iter()
            .filter(|mapping| selector.matches(&mapping.tags))
            .map(|mapping| mapping.arn)
            .collect();

        Ok(owners)
    }
}

#[async_trait]
impl ClusterResourceManager for CacheSnapshotEngine {
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

        let owners = self.owners(&selector).await?;
        if owners.is_empty() {
            debug!(engine = KIND.as_str(), cluster_id, "No cluster cache snapshots");
            return Ok(Vec::new());
        }

        let owned: Vec<_> = self
            .elasticache
            .describe_snapshots()
            .await
            .map_err(|source| EngineError::Describe {
                what: "cache snapshots",
                source,
            })?
            .into_iter()
            .filter(|snapshot| owners.owns(snapshot))
            .collect();
        debug!(engine = KIND.as_str(), cluster_id, count = owned.len(), "Found cluster cache snapshots");

        let mut items = Vec::with_capacity(owned.len());
        for snapshot in owned {
            let id = snapshot.arn.clone().unwrap_or_else(|| snapshot.name.clone());

            if snapshot.status == STATUS_DELETING {
                items.push(ReportItem::in_progress(id, &snapshot.name));
                continue;
            }

            if dry_run {
                info!(resource_id = %snapshot.name, "[DRY RUN] Would delete cache snapshot");
                items.push(ReportItem::dry_run(id, &snapshot.name));
                continue;
            }

            ignore_not_found(
                self.elasticache.delete_snapshot(&snapshot.name).await,
                &snapshot.name,
            )
            .map_err(|source| EngineError::Delete {
                what: KIND.description(),
                id: snapshot.name.clone(),
                source,
            })?;

            items.push(ReportItem::in_progress(id, &snapshot.name));
        }

        Ok(items)
    }
}
