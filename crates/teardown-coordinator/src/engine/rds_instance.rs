//! Database instance engine

use super::{ClusterResourceManager, EngineError, STATUS_DELETING, ignore_not_found};
use crate::aws::{RdsApi, is_not_found};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teardown_common::{ClusterSelector, ReportItem, ResourceKind};
use tracing::{debug, info};

const KIND: ResourceKind = ResourceKind::RdsInstance;

/// Deletes the cluster's RDS instances, lifting deletion protection first.
pub struct RdsInstanceEngine {
    rds: Arc<dyn RdsApi>,
    tag_key: String,
}

impl RdsInstanceEngine {
    pub fn new(rds: Arc<dyn RdsApi>, tag_key: impl Into<String>) -> Self {
        Self {
            rds,
            tag_key: tag_key.into(),
        }
    }
}

#[async_trait]
impl ClusterResourceManager for RdsInstanceEngine {
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

        let instances = self
            .rds
            .describe_db_instances()
            .await
            .map_err(|source| EngineError::Describe {
                what: "database instances",
                source,
            })?;

        // Tags are not part of the listing, so each instance is checked on its own
        let mut owned = Vec::new();
        for instance in instances {
            let instance_tags = match self.rds.list_tags_for_resource(&instance.arn).await {
                Ok(tags) => tags,
                // Finished deleting since the listing
                Err(e) if is_not_found(&e) => {
                    debug!(
                        resource_id = %instance.identifier,
                        "DB instance gone before tag lookup"
                    );
                    continue;
                }
                Err(source) => {
                    return Err(EngineError::DescribeTags {
                        what: KIND.description(),
                        id: instance.identifier,
                        source,
                    });
                }
            };
            if selector.matches(&instance_tags) {
                owned.push(instance);
            }
        }
        debug!(engine = KIND.as_str(), cluster_id, count = owned.len(), "Found cluster DB instances");

        let mut items = Vec::with_capacity(owned.len());
        for instance in owned {
            if instance.status == STATUS_DELETING {
                debug!(resource_id = %instance.identifier, "DB instance already deleting");
                items.push(ReportItem::in_progress(&instance.arn, &instance.identifier));
                continue;
            }

            if dry_run {
                info!(resource_id = %instance.identifier, "[DRY RUN] Would delete DB instance");
                items.push(ReportItem::dry_run(&instance.arn, &instance.identifier));
                continue;
            }

            if instance.deletion_protection {
                ignore_not_found(
                    self.rds.disable_deletion_protection(&instance.identifier).await,
                    &instance.identifier,
                )
                .map_err(|source| EngineError::DisableProtection {
                    what: KIND.description(),
                    id: instance.identifier.clone(),
                    source,
                })?;
            }

            ignore_not_found(
                self.rds.delete_db_instance(&instance.identifier).await,
                &instance.identifier,
            )
            .map_err(|source| EngineError::Delete {
                what: KIND.description(),
                id: instance.identifier.clone(),
                source,
            })?;

            items.push(ReportItem::in_progress(&instance.arn, &instance.identifier));
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::classify_aws_error;
    use crate::aws::rds::{DbInstance, MockRdsApi};
    use teardown_common::ActionStatus;
    use teardown_test_utils::{TEST_CLUSTER_ID, TEST_TAG_KEY, cluster_tags, fixtures};

    fn instance(id: &str, status: &str, protected: bool) -> DbInstance {
        DbInstance {
            identifier: id.to_string(),
            arn: fixtures::rds_instance_arn(id),
            status: status.to_string(),
            deletion_protection: protected,
        }
    }

    /// Two cluster instances and one belonging to another cluster
    fn mock_with_instances(instances: Vec<DbInstance>) -> MockRdsApi {
        let mut rds = MockRdsApi::new();
        rds.expect_describe_db_instances()
            .returning(move || Ok(instances.clone()));
        rds.expect_list_tags_for_resource().returning(|arn| {
            if arn.ends_with("other-db") {
                Ok(cluster_tags("someOtherCluster"))
            } else {
                Ok(cluster_tags(TEST_CLUSTER_ID))
            }
        });
        rds
    }

    fn default_instances() -> Vec<DbInstance> {
        vec![
            instance("db-1", "available", false),
            instance("db-2", "available", false),
            instance("other-db", "available", false),
        ]
    }

    #[tokio::test]
    async fn dry_run_reports_without_deleting() {
        let mut rds = mock_with_instances(default_instances());
        rds.expect_delete_db_instance().never();
        rds.expect_disable_deletion_protection().never();
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), true)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.action_status == ActionStatus::DryRun));
        assert_eq!(items[0].id, fixtures::rds_instance_arn("db-1"));
        assert_eq!(items[0].name, "db-1");
    }

    #[tokio::test]
    async fn dry_run_is_idempotent() {
        let mut rds = mock_with_instances(default_instances());
        rds.expect_delete_db_instance().never();
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let first = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), true)
            .await
            .unwrap();
        let second = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), true)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn execute_deletes_each_instance_once() {
        let mut rds = mock_with_instances(default_instances());
        rds.expect_delete_db_instance()
            .withf(|id| id == "db-1")
            .times(1)
            .returning(|_| Ok(()));
        rds.expect_delete_db_instance()
            .withf(|id| id == "db-2")
            .times(1)
            .returning(|_| Ok(()));
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), false)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.action_status == ActionStatus::InProgress));
    }

    #[tokio::test]
    async fn protected_instance_is_unprotected_first() {
        let mut rds = mock_with_instances(vec![instance("db-1", "available", true)]);
        let mut seq = mockall::Sequence::new();
        rds.expect_disable_deletion_protection()
            .withf(|id| id == "db-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        rds.expect_delete_db_instance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), false)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn deleting_instance_is_not_deleted_again() {
        let mut rds = mock_with_instances(vec![instance("db-1", STATUS_DELETING, false)]);
        rds.expect_delete_db_instance().never();
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), false)
            .await
            .unwrap();
        assert_eq!(items[0].action_status, ActionStatus::InProgress);
    }

    #[tokio::test]
    async fn vanished_instance_counts_as_in_progress() {
        let mut rds = mock_with_instances(vec![instance("db-1", "available", false)]);
        rds.expect_delete_db_instance().returning(|_| {
            Err(classify_aws_error(Some("DBInstanceNotFound"), Some("gone")).into())
        });
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), false)
            .await
            .unwrap();
        assert_eq!(items[0].action_status, ActionStatus::InProgress);
    }

    #[tokio::test]
    async fn instance_gone_before_tag_lookup_is_skipped() {
        let mut rds = MockRdsApi::new();
        rds.expect_describe_db_instances().returning(|| {
            Ok(vec![
                instance("db-1", "available", false),
                instance("unrelated", "deleting", false),
            ])
        });
        rds.expect_list_tags_for_resource().returning(|arn| {
            if arn.ends_with("unrelated") {
                Err(classify_aws_error(Some("DBInstanceNotFound"), Some("gone")).into())
            } else {
                Ok(cluster_tags(TEST_CLUSTER_ID))
            }
        });
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), true)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "db-1");
    }

    #[tokio::test]
    async fn tag_lookup_failure_names_the_instance() {
        let mut rds = MockRdsApi::new();
        rds.expect_describe_db_instances()
            .returning(|| Ok(vec![instance("db-1", "available", false)]));
        rds.expect_list_tags_for_resource().returning(|_| {
            Err(classify_aws_error(Some("AccessDenied"), Some("denied")).into())
        });
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let err = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::DescribeTags { .. }));
        assert!(
            err.to_string()
                .starts_with("failed to list tags for database instance db-1: ")
        );
    }

    #[tokio::test]
    async fn delete_failure_stops_remaining_instances() {
        let mut rds = mock_with_instances(default_instances());
        rds.expect_delete_db_instance()
            .withf(|id| id == "db-1")
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("AccessDenied")));
        rds.expect_delete_db_instance()
            .withf(|id| id == "db-2")
            .never();
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let err = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), false)
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("failed to delete database instance db-1: ")
        );
    }

    #[tokio::test]
    async fn describe_failure_returns_no_items() {
        let mut rds = MockRdsApi::new();
        rds.expect_describe_db_instances()
            .returning(|| Err(anyhow::anyhow!("")));
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let err = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to describe database instances: ");
    }

    #[tokio::test]
    async fn extra_tags_narrow_the_selection() {
        let mut rds = MockRdsApi::new();
        rds.expect_describe_db_instances().returning(|| {
            Ok(vec![
                instance("db-1", "available", false),
                instance("db-2", "available", false),
            ])
        });
        rds.expect_list_tags_for_resource().returning(|arn| {
            if arn.ends_with("db-1") {
                Ok(teardown_test_utils::fixtures::cluster_tags_with(
                    TEST_CLUSTER_ID,
                    &[("env", "prod")],
                ))
            } else {
                Ok(cluster_tags(TEST_CLUSTER_ID))
            }
        });
        let engine = RdsInstanceEngine::new(Arc::new(rds), TEST_TAG_KEY);

        let extra = HashMap::from([("env".to_string(), "prod".to_string())]);
        let items = engine
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &extra, true)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "db-1");
    }
}
