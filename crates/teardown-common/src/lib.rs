//! teardown-common - Shared types for cluster teardown
//!
//! This crate holds the provider-neutral pieces of the teardown system,
//! without any AWS SDK dependencies so reports can be consumed elsewhere.
//!
//! ## Modules
//!
//! - [`report`]: Report model and forward merge
//! - [`resource_kind`]: Resource types and their teardown order
//! - [`tags`]: Cluster ownership tag selection
//! - [`defaults`]: Default configuration values

pub mod defaults;
pub mod report;
pub mod resource_kind;
pub mod tags;

// Re-export commonly used types
pub use report::{Action, ActionStatus, Report, ReportItem, ReportSummary};
pub use resource_kind::ResourceKind;
pub use tags::{ClusterSelector, DEFAULT_CLUSTER_TAG_KEY};
