//! Shared test utilities for cluster-teardown
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique cluster ids for live tests
//! - [`fixtures`]: Canned identifiers, tags and report items

pub mod aws;
pub mod fixtures;

// Re-export commonly used items
pub use aws::{get_test_region, test_cluster_id};
pub use fixtures::{TEST_CLUSTER_ID, TEST_TAG_KEY, cluster_tags, item};
