//! Manual database snapshot engine

use super::{ClusterResourceManager, EngineError, STATUS_DELETING, ignore_not_found};
use crate::aws::RdsApi;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teardown_common::{ClusterSelector, ReportItem, ResourceKind};
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::RdsSnapshot;

/// Deletes the cluster's manual RDS snapshots, matched on the tags the
/// listing already returns.
pub struct RdsSnapshotEngine {
    rds: Arc<dyn RdsApi>,
    tag_key: String,
}

impl RdsSnapshotEngine {
    pub fn new(rds: Arc<dyn RdsApi>, tag_key: impl Into<String>) -> Self {
        Self {
            rds,
            tag_key: tag_key.into(),
        }
    }
}

#[async_trait]
impl ClusterResourceManager for RdsSnapshotEngine {
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

        let owned: Vec<_> = self
            .rds
            .describe_db_snapshots()
            .await
            .map_err(|source| EngineError::Describe {
                what: "database snapshots",
                source,
            })?
            .into_iter()
            .filter(|snapshot| selector.matches(&snapshot.tags))
            .collect();
        debug!(engine = KIND.as_str(), cluster_id, count = owned.len(), "Found cluster DB snapshots");

        let mut items = Vec::with_capacity(owned.len());
        for snapshot in owned {
            if snapshot.status == STATUS_DELETING {
                items.push(ReportItem::in_progress(&snapshot.arn, &snapshot.identifier));
                continue;
            }

            if dry_run {
                info!(resource_id = %snapshot.identifier, "[DRY RUN] Would delete DB snapshot");
                items.push(ReportItem::dry_run(&snapshot.arn, &snapshot.identifier));
                continue;
            }

            ignore_not_found(
                self.rds.delete_db_snapshot(&snapshot.identifier).await,
                &snapshot.identifier,
            )
            .map_err(|source| EngineError::Delete {
                what: KIND.description(),
                id: snapshot.identifier.clone(),
                source,
            })?;

            items.push(ReportItem::in_progress(&snapshot.arn, &snapshot.identifier));
        }

        Ok(items)
    }
}
