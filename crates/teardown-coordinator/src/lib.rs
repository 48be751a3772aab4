//! teardown-coordinator - Tag-based teardown of cluster-owned AWS resources
//!
//! Discovers the RDS, ElastiCache and S3 resources carrying a cluster's
//! ownership tag, deletes them and reports progress across repeated polls.

pub mod aws;
pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod output;
pub mod reconcile;
pub mod teardown;
pub mod wait;
