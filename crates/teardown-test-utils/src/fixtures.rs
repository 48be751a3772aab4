//! Canned values for engine, orchestrator and reconciliation tests

use std::collections::HashMap;
use teardown_common::{Action, ActionStatus, DEFAULT_CLUSTER_TAG_KEY, ReportItem};

/// Cluster id used throughout unit tests
pub const TEST_CLUSTER_ID: &str = "testClusterId";

/// Cluster tag key used throughout unit tests
pub const TEST_TAG_KEY: &str = DEFAULT_CLUSTER_TAG_KEY;

/// Region embedded in fake ARNs
pub const TEST_REGION: &str = "eu-west-1";

/// Account embedded in fake ARNs
pub const TEST_ACCOUNT: &str = "123456789012";

/// Tag set marking a resource as owned by `cluster_id`
pub fn cluster_tags(cluster_id: &str) -> HashMap<String, String> {
    HashMap::from([(TEST_TAG_KEY.to_string(), cluster_id.to_string())])
}

/// Tag set with extra pairs on top of the cluster tag
pub fn cluster_tags_with(cluster_id: &str, extra: &[(&str, &str)]) -> HashMap<String, String> {
    let mut tags = cluster_tags(cluster_id);
    tags.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    tags
}

/// Fake RDS instance ARN
pub fn rds_instance_arn(id: &str) -> String {
    format!("arn:aws:rds:{TEST_REGION}:{TEST_ACCOUNT}:db:{id}")
}

/// Fake RDS snapshot ARN
pub fn rds_snapshot_arn(id: &str) -> String {
    format!("arn:aws:rds:{TEST_REGION}:{TEST_ACCOUNT}:snapshot:{id}")
}

/// Fake ElastiCache cache cluster ARN
pub fn cache_cluster_arn(id: &str) -> String {
    format!("arn:aws:elasticache:{TEST_REGION}:{TEST_ACCOUNT}:cluster:{id}")
}

/// Fake ElastiCache replication group ARN
pub fn replication_group_arn(id: &str) -> String {
    format!("arn:aws:elasticache:{TEST_REGION}:{TEST_ACCOUNT}:replicationgroup:{id}")
}

/// Fake ElastiCache snapshot ARN
pub fn cache_snapshot_arn(name: &str) -> String {
    format!("arn:aws:elasticache:{TEST_REGION}:{TEST_ACCOUNT}:snapshot:{name}")
}

/// Report item with an explicit status
pub fn item(id: &str, name: &str, status: ActionStatus) -> ReportItem {
    ReportItem {
        id: id.to_string(),
        name: name.to_string(),
        action: Action::Delete,
        action_status: status,
    }
}
