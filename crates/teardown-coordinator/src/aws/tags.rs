//! Conversion of per-service tag lists into plain maps

use std::collections::HashMap;

/// Resource type filter for ElastiCache cache clusters in the tagging API
pub const CACHE_CLUSTER_RESOURCE_TYPE: &str = "elasticache:cluster";

/// Resource type filter for ElastiCache snapshots in the tagging API
pub const CACHE_SNAPSHOT_RESOURCE_TYPE: &str = "elasticache:snapshot";

/// Collect key/value pairs from any SDK tag type, skipping incomplete tags
pub fn extract_tags<T>(
    tags: &[T],
    key: impl Fn(&T) -> Option<&str>,
    value: impl Fn(&T) -> Option<&str>,
) -> HashMap<String, String> {
    tags.iter()
        .filter_map(|t| match (key(t), value(t)) {
            (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
            _ => None,
        })
        .collect()
}

pub fn extract_rds_tags(tags: &[aws_sdk_rds::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| t.key(), |t| t.value())
}

pub fn extract_s3_tags(tags: &[aws_sdk_s3::types::Tag]) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| Some(t.value()))
}

pub fn extract_tagging_tags(
    tags: &[aws_sdk_resourcegroupstagging::types::Tag],
) -> HashMap<String, String> {
    extract_tags(tags, |t| Some(t.key()), |t| Some(t.value()))
}
