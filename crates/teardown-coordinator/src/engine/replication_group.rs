//! ElastiCache replication group engine

use super::cache_clusters::owned_cache_clusters;
use super::{ClusterResourceManager, EngineError, STATUS_DELETING, ignore_not_found};
use crate::aws::{ElasticacheApi, TagIndex};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use teardown_common::{ClusterSelector, ReportItem, ResourceKind};
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::ElasticacheReplicationGroup;

/// Deletes the replication groups whose member nodes carry the cluster tag.
pub struct ReplicationGroupEngine {
    elasticache: Arc<dyn ElasticacheApi>,
    tag_index: Arc<dyn TagIndex>,
    tag_key: String,
}

impl ReplicationGroupEngine {
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
}

#[async_trait]
impl ClusterResourceManager for ReplicationGroupEngine {
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

        let group_ids: BTreeSet<String> =
            owned_cache_clusters(self.tag_index.as_ref(), self.elasticache.as_ref(), &selector)
                .await?
                .into_iter()
                .filter_map(|cluster| cluster.replication_group_id)
                .collect();
        if group_ids.is_empty() {
            debug!(engine = KIND.as_str(), cluster_id, "No cluster replication groups");
            return Ok(Vec::new());
        }

        let owned: Vec<_> = self
            .elasticache
            .describe_replication_groups()
            .await
            .map_err(|source| EngineError::Describe {
                what: "replication groups",
                source,
            })?
            .into_iter()
            .filter(|group| group_ids.contains(&group.id))
            .collect();
        debug!(engine = KIND.as_str(), cluster_id, count = owned.len(), "Found cluster replication groups");

        let mut items = Vec::with_capacity(owned.len());
        for group in owned {
            let id = group.arn.clone().unwrap_or_else(|| group.id.clone());

            if group.status == STATUS_DELETING {
                items.push(ReportItem::in_progress(id, &group.id));
                continue;
            }

            if dry_run {
                info!(resource_id = %group.id, "[DRY RUN] Would delete replication group");
                items.push(ReportItem::dry_run(id, &group.id));
                continue;
            }

            ignore_not_found(
                self.elasticache.delete_replication_group(&group.id).await,
                &group.id,
            )
            .map_err(|source| EngineError::Delete {
                what: KIND.description(),
                id: group.id.clone(),
                source,
            })?;

            items.push(ReportItem::in_progress(id, &group.id));
        }

        Ok(items)
    }
}
