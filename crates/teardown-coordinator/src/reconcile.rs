//! Reconciliation of successive teardown reports
//!
//! A resource disappearing from discovery is the only sign that its deletion
//! finished, so each cycle's fresh report is merged into the previously
//! published one instead of replacing it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use teardown_common::{Report, ReportItem};
use tempfile::NamedTempFile;
use tracing::debug;

/// Turns a fresh cycle report into the report to publish.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    adopt_new_items: bool,
}

impl Reconciler {
    /// With `adopt_new_items`, resources first seen after the initial cycle
    /// are appended to the published report. Otherwise they only show up in
    /// the fresh report until a new teardown starts.
    pub fn new(adopt_new_items: bool) -> Self {
        Self { adopt_new_items }
    }

    /// The first cycle publishes `fresh` as is.
    pub fn reconcile(&self, previous: Option<&Report>, fresh: Report) -> Report {
        let Some(previous) = previous else {
            return fresh;
        };

        let merged = previous.merge_forward(&fresh);
        self.maybe_adopt(merged, &fresh)
    }

    /// Reconcile against a report that misses the items of failed engines.
    ///
    /// Previous items for which `held` returns true came from a failed
    /// engine; when missing from `fresh` they keep their status instead of
    /// completing. Every other item is merged forward as usual.
    pub fn reconcile_partial(
        &self,
        previous: Option<&Report>,
        fresh: Report,
        held: impl Fn(&ReportItem) -> bool,
    ) -> Report {
        let Some(previous) = previous else {
            return fresh;
        };

        let merged = previous
            .items
            .iter()
            .map(|item| match fresh.get(&item.id) {
                Some(later) => item.merge_forward(Some(later)),
                None if held(item) => item.clone(),
                None => item.merge_forward(None),
            })
            .collect();
        self.maybe_adopt(merged, &fresh)
    }

    fn maybe_adopt(&self, merged: Report, fresh: &Report) -> Report {
        if self.adopt_new_items {
            merged.adopt_new_items(fresh)
        } else {
            merged
        }
    }
}

/// A published report as persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReport {
    pub cluster_id: String,
    pub dry_run: bool,
    pub updated_at: DateTime<Utc>,
    pub report: Report,
    /// Engine that last reported each item, keyed by item id
    #[serde(default)]
    pub owners: HashMap<String, String>,
}

impl StoredReport {
    pub fn new(cluster_id: impl Into<String>, dry_run: bool, report: Report) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            dry_run,
            updated_at: Utc::now(),
            report,
            owners: HashMap::new(),
        }
    }

    pub fn with_owners(mut self, owners: HashMap<String, String>) -> Self {
        self.owners = owners;
        self
    }
}

/// JSON file holding the last published report
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored report; a missing file means no previous cycle.
    pub fn load(&self) -> Result<Option<StoredReport>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        let stored = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse report in {}", self.path.display()))?;
        Ok(Some(stored))
    }

    /// Read the stored report, refusing one written for another cluster.
    pub fn load_for(&self, cluster_id: &str) -> Result<Option<StoredReport>> {
        match self.load()? {
            Some(stored) if stored.cluster_id != cluster_id => anyhow::bail!(
                "{} holds the report of cluster '{}', not '{}'",
                self.path.display(),
                stored.cluster_id,
                cluster_id
            ),
            other => Ok(other),
        }
    }

    /// Replace the stored report atomically.
    pub fn save(&self, stored: &StoredReport) -> Result<()> {
        let json = serde_json::to_string_pretty(stored).context("Failed to serialize report")?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes()).context("Failed to write report")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), items = stored.report.len(), "Saved report");
        Ok(())
    }
}
