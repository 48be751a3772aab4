//! Cache cluster ownership lookup shared by the ElastiCache engines
//!
//! The tag index yields the ARNs of cache clusters carrying the cluster tag.
//! Those are intersected with DescribeCacheClusters to learn which
//! replication group each node belongs to.

use super::EngineError;
use crate::aws::elasticache::CacheCluster;
use crate::aws::tags::CACHE_CLUSTER_RESOURCE_TYPE;
use crate::aws::{ElasticacheApi, TagIndex};
use std::collections::HashSet;
use teardown_common::ClusterSelector;

/// Cache clusters tagged for the selected cluster
pub(crate) async fn owned_cache_clusters(
    tag_index: &dyn TagIndex,
    elasticache: &dyn ElasticacheApi,
    selector: &ClusterSelector,
) -> Result<Vec<CacheCluster>, EngineError> {
    let tagged: HashSet<String> = tag_index
        .get_resources_by_tags(CACHE_CLUSTER_RESOURCE_TYPE, &selector.required_tags())
        .await
        .map_err(|source| EngineError::Describe {
            what: "cache clusters",
            source,
        })?
        .into_iter()
        .filter(|mapping| selector.matches(&mapping.tags))
        .map(|mapping| mapping.arn)
        .collect();

    if tagged.is_empty() {
        return Ok(Vec::new());
    }

    let clusters = elasticache
        .describe_cache_clusters()
        .await
        .map_err(|source| EngineError::Output {
            what: "cacheCluster",
            source,
        })?;

    Ok(clusters
        .into_iter()
        .filter(|cluster| tagged.contains(&cluster.arn))
        .collect())
}
