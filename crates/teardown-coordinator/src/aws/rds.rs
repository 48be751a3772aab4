//! RDS database instance and snapshot operations

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_sdk_error;
use crate::aws::tags::extract_rds_tags;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_rds::Client;
use std::collections::HashMap;
use tracing::{debug, info};

/// Only operator-created snapshots are removed; automated backups go with
/// their instance.
const MANUAL_SNAPSHOT_TYPE: &str = "manual";

/// A database instance as seen by the teardown engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInstance {
    pub identifier: String,
    pub arn: String,
    pub status: String,
    pub deletion_protection: bool,
}

/// A manual database snapshot with its own tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSnapshot {
    pub identifier: String,
    pub arn: String,
    pub status: String,
    pub tags: HashMap<String, String>,
}

/// Trait for RDS operations that can be mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RdsApi: Send + Sync {
    /// List every database instance in the region
    async fn describe_db_instances(&self) -> Result<Vec<DbInstance>>;

    /// Get the tags of a database resource by ARN
    async fn list_tags_for_resource(&self, arn: &str) -> Result<HashMap<String, String>>;

    /// Turn off deletion protection so the instance can be deleted
    async fn disable_deletion_protection(&self, identifier: &str) -> Result<()>;

    /// Delete an instance without a final snapshot
    async fn delete_db_instance(&self, identifier: &str) -> Result<()>;

    /// List every manual database snapshot in the region
    async fn describe_db_snapshots(&self) -> Result<Vec<DbSnapshot>>;

    /// Delete a manual snapshot
    async fn delete_db_snapshot(&self, identifier: &str) -> Result<()>;
}

/// RDS client backed by the AWS SDK
pub struct RdsClient {
    client: Client,
}

impl FromAwsContext for RdsClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.rds_client(),
        }
    }
}

#[async_trait]
impl RdsApi for RdsClient {
    async fn describe_db_instances(&self) -> Result<Vec<DbInstance>> {
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_db_instances()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to describe DB instances")?;

            for instance in response.db_instances() {
                let (Some(identifier), Some(arn)) =
                    (instance.db_instance_identifier(), instance.db_instance_arn())
                else {
                    continue;
                };
                instances.push(DbInstance {
                    identifier: identifier.to_string(),
                    arn: arn.to_string(),
                    status: instance.db_instance_status().unwrap_or_default().to_string(),
                    deletion_protection: instance.deletion_protection().unwrap_or(false),
                });
            }

            match response.marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        debug!(count = instances.len(), "Described DB instances");
        Ok(instances)
    }

    async fn list_tags_for_resource(&self, arn: &str) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .list_tags_for_resource()
            .resource_name(arn)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to list tags for resource")?;

        Ok(extract_rds_tags(response.tag_list()))
    }

    async fn disable_deletion_protection(&self, identifier: &str) -> Result<()> {
        info!(db_instance = %identifier, "Disabling deletion protection");

        self.client
            .modify_db_instance()
            .db_instance_identifier(identifier)
            .deletion_protection(false)
            .apply_immediately(true)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to modify DB instance")?;

        Ok(())
    }

    async fn delete_db_instance(&self, identifier: &str) -> Result<()> {
        info!(db_instance = %identifier, "Deleting DB instance");

        self.client
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(true)
            .delete_automated_backups(true)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to delete DB instance")?;

        Ok(())
    }

    async fn describe_db_snapshots(&self) -> Result<Vec<DbSnapshot>> {
        let mut snapshots = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_db_snapshots()
                .snapshot_type(MANUAL_SNAPSHOT_TYPE)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| classify_sdk_error(&e))
                .context("Failed to describe DB snapshots")?;

            for snapshot in response.db_snapshots() {
                let (Some(identifier), Some(arn)) =
                    (snapshot.db_snapshot_identifier(), snapshot.db_snapshot_arn())
                else {
                    continue;
                };
                snapshots.push(DbSnapshot {
                    identifier: identifier.to_string(),
                    arn: arn.to_string(),
                    status: snapshot.status().unwrap_or_default().to_string(),
                    tags: extract_rds_tags(snapshot.tag_list()),
                });
            }

            match response.marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        debug!(count = snapshots.len(), "Described DB snapshots");
        Ok(snapshots)
    }

    async fn delete_db_snapshot(&self, identifier: &str) -> Result<()> {
        info!(db_snapshot = %identifier, "Deleting DB snapshot");

        self.client
            .delete_db_snapshot()
            .db_snapshot_identifier(identifier)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to delete DB snapshot")?;

        Ok(())
    }
}
