//! Live AWS teardown tests - actually call AWS APIs
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_live_integration -- --ignored
//! ```
//!
//! They only dry-run against a freshly generated cluster id, so nothing is
//! ever deleted.

use std::collections::HashMap;
use teardown_common::{DEFAULT_CLUSTER_TAG_KEY, ResourceKind};
use teardown_coordinator::aws::AwsContext;
use teardown_coordinator::engine::build_engines;
use teardown_coordinator::orchestrator::Orchestrator;
use teardown_test_utils::{get_test_region, test_cluster_id};
use tokio_util::sync::CancellationToken;

/// Every engine can list its resources and finds none for an unknown cluster
#[tokio::test]
#[ignore]
async fn test_dry_run_unknown_cluster_is_empty() {
    let aws = AwsContext::new(&get_test_region()).await;
    let orchestrator = Orchestrator::new(build_engines(
        &aws,
        &ResourceKind::ALL,
        DEFAULT_CLUSTER_TAG_KEY,
    ));

    let outcome = orchestrator
        .delete_resources_for_cluster(
            &test_cluster_id(),
            &HashMap::new(),
            true,
            &CancellationToken::new(),
        )
        .await;

    let report = outcome
        .into_result()
        .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID");
    assert!(report.is_empty());
}

/// Engine registration follows the teardown order
#[tokio::test]
#[ignore]
async fn test_engine_names_follow_teardown_order() {
    let aws = AwsContext::new(&get_test_region()).await;
    let orchestrator = Orchestrator::new(build_engines(
        &aws,
        &[ResourceKind::S3Bucket, ResourceKind::RdsInstance],
        DEFAULT_CLUSTER_TAG_KEY,
    ));

    assert_eq!(orchestrator.engine_names(), ["rds-instance", "s3-bucket"]);
}
