//! Cluster ownership tags
//!
//! A provider resource belongs to a cluster when it carries the cluster tag
//! with the cluster identifier as its value. Callers may narrow the match
//! with additional tag pairs, all of which must be present.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `integreatly.org/clusterID` | Cluster identifier (default key, configurable) |
//! | any extra `KEY=VALUE` | Optional further restriction supplied per run |

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Default tag key marking cluster ownership
pub const DEFAULT_CLUSTER_TAG_KEY: &str = "integreatly.org/clusterID";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagParseError {
    #[error("invalid tag '{0}': expected KEY=VALUE")]
    MissingSeparator(String),
    #[error("invalid tag '{0}': key must not be empty")]
    EmptyKey(String),
}

/// Parse a `KEY=VALUE` tag argument. The value may contain `=`.
pub fn parse_tag_pair(s: &str) -> Result<(String, String), TagParseError> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| TagParseError::MissingSeparator(s.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(TagParseError::EmptyKey(s.to_string()));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Selects the resources owned by one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSelector {
    tag_key: String,
    cluster_id: String,
    extra: BTreeMap<String, String>,
}

impl ClusterSelector {
    pub fn new(
        tag_key: impl Into<String>,
        cluster_id: impl Into<String>,
        extra: &HashMap<String, String>,
    ) -> Self {
        Self {
            tag_key: tag_key.into(),
            cluster_id: cluster_id.into(),
            extra: extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Every tag pair a resource must carry, cluster tag included.
    ///
    /// The cluster tag wins if an extra pair reuses its key.
    pub fn required_tags(&self) -> HashMap<String, String> {
        let mut tags: HashMap<String, String> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        tags.insert(self.tag_key.clone(), self.cluster_id.clone());
        tags
    }

    /// Whether a resource's tag set satisfies this selector
    pub fn matches(&self, tags: &HashMap<String, String>) -> bool {
        self.required_tags()
            .iter()
            .all(|(key, value)| tags.get(key) == Some(value))
    }
}
