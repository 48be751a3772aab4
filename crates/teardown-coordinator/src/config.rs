//! Configuration types for a teardown run

use crate::output::OutputFormat;
use crate::wait::PollConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use teardown_common::{ClusterSelector, ResourceKind};

/// AWS connection settings
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Which resources belong to the cluster being torn down
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub cluster_id: String,
    /// Tag key whose value is the cluster id
    pub tag_key: String,
    /// Extra tag pairs every resource must also carry
    pub tags: HashMap<String, String>,
    /// Resource kinds to handle; empty means all
    pub kinds: Vec<ResourceKind>,
}

impl ClusterConfig {
    pub fn selector(&self) -> ClusterSelector {
        ClusterSelector::new(&self.tag_key, &self.cluster_id, &self.tags)
    }

    /// Kinds to run, falling back to every kind
    pub fn kinds(&self) -> Vec<ResourceKind> {
        if self.kinds.is_empty() {
            ResourceKind::ALL.to_vec()
        } else {
            self.kinds.clone()
        }
    }
}

/// Runtime behavior flags
#[derive(Debug, Clone)]
pub struct RuntimeFlags {
    /// Actually delete; otherwise only report
    pub execute: bool,
    /// Report file to reconcile against and update
    pub state_file: Option<PathBuf>,
    pub format: OutputFormat,
    /// Keep cycling until everything is gone
    pub watch: bool,
    /// Initial delay between watch cycles, in seconds
    pub poll_interval: u64,
    /// Cap on the delay between watch cycles, in seconds
    pub max_poll_interval: u64,
    /// Limit on the whole watch loop, in seconds
    pub watch_timeout: u64,
    /// Limit on a single cycle, in seconds (0 disables it)
    pub cycle_timeout: u64,
    /// Add resources first seen after the initial cycle to the report
    pub adopt_new_items: bool,
}

/// Configuration for a teardown run
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    pub aws: AwsConfig,
    pub cluster: ClusterConfig,
    pub flags: RuntimeFlags,
}

impl TeardownConfig {
    pub fn dry_run(&self) -> bool {
        !self.flags.execute
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            initial_delay: Duration::from_secs(self.flags.poll_interval),
            max_delay: Duration::from_secs(self.flags.max_poll_interval.max(self.flags.poll_interval)),
            timeout: Duration::from_secs(self.flags.watch_timeout),
        }
    }

    pub fn cycle_timeout(&self) -> Option<Duration> {
        (self.flags.cycle_timeout > 0).then(|| Duration::from_secs(self.flags.cycle_timeout))
    }
}
