//! Resource types handled by the teardown engines
//!
//! Provides a consistent engine ordering across the orchestrator and CLI.
//! Engines are independent, so the order only decides how a report lists
//! its items.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Types of AWS resources removed during a cluster teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// RDS database instance
    RdsInstance,
    /// Manual RDS snapshot
    RdsSnapshot,
    /// ElastiCache replication group
    ElasticacheReplicationGroup,
    /// ElastiCache snapshot
    ElasticacheSnapshot,
    /// S3 bucket and its objects
    S3Bucket,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub struct UnknownResourceKind(pub String);

impl fmt::Display for UnknownResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown resource kind '{}' (expected one of: {})",
            self.0,
            ResourceKind::names().join(", ")
        )
    }
}

impl ResourceKind {
    /// Every kind, in teardown order
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::RdsInstance,
        ResourceKind::RdsSnapshot,
        ResourceKind::ElasticacheReplicationGroup,
        ResourceKind::ElasticacheSnapshot,
        ResourceKind::S3Bucket,
    ];

    /// Stable name, also used as the engine name in logs and errors
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::RdsInstance => "rds-instance",
            ResourceKind::RdsSnapshot => "rds-snapshot",
            ResourceKind::ElasticacheReplicationGroup => "elasticache-replication-group",
            ResourceKind::ElasticacheSnapshot => "elasticache-snapshot",
            ResourceKind::S3Bucket => "s3-bucket",
        }
    }

    /// Human-readable noun used in error messages
    pub fn description(self) -> &'static str {
        match self {
            ResourceKind::RdsInstance => "database instance",
            ResourceKind::RdsSnapshot => "database snapshot",
            ResourceKind::ElasticacheReplicationGroup => "replication group",
            ResourceKind::ElasticacheSnapshot => "cache snapshot",
            ResourceKind::S3Bucket => "bucket",
        }
    }

    /// Teardown priority (lower number = registered first)
    ///
    /// Parents are listed before the snapshots they own so a report reads
    /// top-down, but no engine waits on another.
    pub fn teardown_priority(self) -> u8 {
        match self {
            ResourceKind::RdsInstance => 0,
            ResourceKind::RdsSnapshot => 1,
            ResourceKind::ElasticacheReplicationGroup => 2,
            ResourceKind::ElasticacheSnapshot => 3,
            ResourceKind::S3Bucket => 4,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim()).ok_or_else(|| UnknownResourceKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_by_priority() {
        let priorities: Vec<u8> = ResourceKind::ALL
            .iter()
            .map(|kind| kind.teardown_priority())
            .collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn parents_before_snapshots() {
        assert!(
            ResourceKind::RdsInstance.teardown_priority()
                < ResourceKind::RdsSnapshot.teardown_priority()
        );
        assert!(
            ResourceKind::ElasticacheReplicationGroup.teardown_priority()
                < ResourceKind::ElasticacheSnapshot.teardown_priority()
        );
    }

    #[test]
    fn parse_round_trips_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "ec2-instance".parse::<ResourceKind>().unwrap_err();
        assert!(err.to_string().contains("ec2-instance"));
        assert!(err.to_string().contains("s3-bucket"));
    }
}
