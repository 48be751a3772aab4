//! Teardown report model
//!
//! A [`Report`] is a point-in-time view of every provider resource that
//! belongs to a cluster, one [`ReportItem`] per resource. Reports from
//! successive polls are reconciled with [`Report::merge_forward`], which
//! treats a resource's absence from the later report as proof that its
//! deletion has completed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Operation applied (or planned) for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The resource is deleted
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage of an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionStatus {
    /// No action determined yet
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Action computed but not executed
    #[serde(rename = "dry run")]
    DryRun,
    /// Execution requested, resource still observed in the backend
    #[serde(rename = "in progress")]
    InProgress,
    /// Resource no longer observed in the backend
    #[serde(rename = "complete")]
    Complete,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Empty => "",
            ActionStatus::DryRun => "dry run",
            ActionStatus::InProgress => "in progress",
            ActionStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider resource in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    /// Provider-unique identifier (ARN or equivalent), the merge key
    pub id: String,
    /// Human-readable label
    pub name: String,
    pub action: Action,
    pub action_status: ActionStatus,
}

impl ReportItem {
    /// Item for a resource whose deletion was only planned
    pub fn dry_run(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_status(id, name, ActionStatus::DryRun)
    }

    /// Item for a resource whose deletion has been requested
    pub fn in_progress(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_status(id, name, ActionStatus::InProgress)
    }

    /// Item for a planned deletion, `DryRun` or `InProgress` depending on mode
    pub fn planned_delete(id: impl Into<String>, name: impl Into<String>, dry_run: bool) -> Self {
        if dry_run {
            Self::dry_run(id, name)
        } else {
            Self::in_progress(id, name)
        }
    }

    fn with_status(id: impl Into<String>, name: impl Into<String>, status: ActionStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            action: Action::Delete,
            action_status: status,
        }
    }

    /// Merge a later observation of the same resource into this one.
    ///
    /// `None` means the resource was absent from the later report, which is
    /// the only completion signal providers give us.
    pub fn merge_forward(&self, later: Option<&ReportItem>) -> ReportItem {
        match later {
            Some(later) => ReportItem {
                id: self.id.clone(),
                name: later.name.clone(),
                action: later.action,
                action_status: later.action_status,
            },
            None => ReportItem {
                action_status: ActionStatus::Complete,
                ..self.clone()
            },
        }
    }
}

/// Per-status item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub empty: usize,
    pub dry_run: usize,
    pub in_progress: usize,
    pub complete: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resources ({} dry run, {} in progress, {} complete)",
            self.total, self.dry_run, self.in_progress, self.complete
        )
    }
}

/// Snapshot of all cluster-owned resources across every engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub items: Vec<ReportItem>,
}

impl Report {
    pub fn new(items: Vec<ReportItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Look up an item by its provider id
    pub fn get(&self, id: &str) -> Option<&ReportItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Merge a later report into this one, returning the report to publish now.
    ///
    /// Items of `self` present in `later` take the later name, action and
    /// status. Items missing from `later` become [`ActionStatus::Complete`]
    /// with name and action untouched. Items only present in `later` are not
    /// carried over; see [`Report::adopt_new_items`].
    pub fn merge_forward(&self, later: &Report) -> Report {
        let lookup: HashMap<&str, &ReportItem> = later
            .items
            .iter()
            .map(|item| (item.id.as_str(), item))
            .collect();

        Report {
            items: self
                .items
                .iter()
                .map(|item| item.merge_forward(lookup.get(item.id.as_str()).copied()))
                .collect(),
        }
    }

    /// Append items of `later` whose ids are not already in this report.
    ///
    /// A repeated id in `later` is adopted once, first occurrence wins.
    pub fn adopt_new_items(mut self, later: &Report) -> Report {
        let mut known: HashSet<String> = self.items.iter().map(|item| item.id.clone()).collect();
        for item in &later.items {
            if known.insert(item.id.clone()) {
                self.items.push(item.clone());
            }
        }
        self
    }

    /// True when every item has completed. An empty report is complete.
    pub fn is_complete(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.action_status == ActionStatus::Complete)
    }

    pub fn summary(&self) -> ReportSummary {
        self.items
            .iter()
            .fold(ReportSummary::default(), |mut acc, item| {
                acc.total += 1;
                match item.action_status {
                    ActionStatus::Empty => acc.empty += 1,
                    ActionStatus::DryRun => acc.dry_run += 1,
                    ActionStatus::InProgress => acc.in_progress += 1,
                    ActionStatus::Complete => acc.complete += 1,
                }
                acc
            })
    }
}

impl From<Vec<ReportItem>> for Report {
    fn from(items: Vec<ReportItem>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<ReportItem> for Report {
    fn from_iter<I: IntoIterator<Item = ReportItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str, status: ActionStatus) -> ReportItem {
        ReportItem {
            id: id.to_string(),
            name: name.to_string(),
            action: Action::Delete,
            action_status: status,
        }
    }

    #[test]
    fn merge_takes_later_fields_for_matching_ids() {
        let earlier = Report::new(vec![
            item("arn:a", "a", ActionStatus::DryRun),
            item("arn:b", "b", ActionStatus::InProgress),
        ]);
        let later = Report::new(vec![
            item("arn:b", "b-renamed", ActionStatus::InProgress),
            item("arn:a", "a", ActionStatus::InProgress),
        ]);

        let merged = earlier.merge_forward(&later);

        assert_eq!(
            merged.items,
            vec![
                item("arn:a", "a", ActionStatus::InProgress),
                item("arn:b", "b-renamed", ActionStatus::InProgress),
            ]
        );
    }

    #[test]
    fn merge_marks_missing_items_complete() {
        let earlier = Report::new(vec![
            item("arn:a", "a", ActionStatus::InProgress),
            item("arn:b", "b", ActionStatus::InProgress),
        ]);
        let later = Report::new(vec![item("arn:a", "a", ActionStatus::InProgress)]);

        let merged = earlier.merge_forward(&later);

        assert_eq!(merged.get("arn:a").unwrap().action_status, ActionStatus::InProgress);
        let gone = merged.get("arn:b").unwrap();
        assert_eq!(gone.action_status, ActionStatus::Complete);
        assert_eq!(gone.name, "b");
        assert_eq!(gone.action, Action::Delete);
    }

    #[test]
    fn merge_against_empty_completes_everything() {
        let earlier = Report::new(vec![
            item("arn:a", "a", ActionStatus::DryRun),
            item("arn:b", "b", ActionStatus::InProgress),
            item("arn:c", "c", ActionStatus::Empty),
        ]);

        let merged = earlier.merge_forward(&Report::default());

        assert_eq!(merged.len(), 3);
        for (before, after) in earlier.items.iter().zip(&merged.items) {
            assert_eq!(after.id, before.id);
            assert_eq!(after.name, before.name);
            assert_eq!(after.action, before.action);
            assert_eq!(after.action_status, ActionStatus::Complete);
        }
        assert!(merged.is_complete());
    }

    #[test]
    fn merge_ignores_items_only_in_later_report() {
        let earlier = Report::new(vec![item("arn:a", "a", ActionStatus::InProgress)]);
        let later = Report::new(vec![
            item("arn:a", "a", ActionStatus::InProgress),
            item("arn:new", "new", ActionStatus::InProgress),
        ]);

        let merged = earlier.merge_forward(&later);

        assert_eq!(merged.len(), 1);
        assert!(merged.get("arn:new").is_none());
    }

    #[test]
    fn merge_with_self_is_idempotent() {
        let report = Report::new(vec![
            item("arn:a", "a", ActionStatus::DryRun),
            item("arn:b", "b", ActionStatus::InProgress),
        ]);

        assert_eq!(report.merge_forward(&report), report);
    }

    #[test]
    fn merge_does_not_touch_the_receiver() {
        let earlier = Report::new(vec![item("x", "x", ActionStatus::InProgress)]);
        let _ = earlier.merge_forward(&Report::default());
        assert_eq!(earlier.items[0].action_status, ActionStatus::InProgress);
    }

    #[test]
    fn adopt_new_items_appends_unknown_ids_only() {
        let earlier = Report::new(vec![item("arn:a", "a", ActionStatus::Complete)]);
        let later = Report::new(vec![
            item("arn:a", "a", ActionStatus::InProgress),
            item("arn:new", "new", ActionStatus::InProgress),
        ]);

        let adopted = earlier.adopt_new_items(&later);

        assert_eq!(adopted.len(), 2);
        assert_eq!(adopted.items[0].action_status, ActionStatus::Complete);
        assert_eq!(adopted.items[1].id, "arn:new");
    }

    #[test]
    fn adopt_new_items_takes_repeated_ids_once() {
        let earlier = Report::new(vec![item("arn:a", "a", ActionStatus::InProgress)]);
        let later = Report::new(vec![
            item("arn:new", "first", ActionStatus::InProgress),
            item("arn:a", "a", ActionStatus::InProgress),
            item("arn:new", "second", ActionStatus::DryRun),
        ]);

        let adopted = earlier.adopt_new_items(&later);

        assert_eq!(
            adopted.items,
            vec![
                item("arn:a", "a", ActionStatus::InProgress),
                item("arn:new", "first", ActionStatus::InProgress),
            ]
        );
    }

    #[test]
    fn completion_and_summary() {
        assert!(Report::default().is_complete());

        let report = Report::new(vec![
            item("a", "a", ActionStatus::Complete),
            item("b", "b", ActionStatus::InProgress),
            item("c", "c", ActionStatus::DryRun),
            item("d", "d", ActionStatus::InProgress),
        ]);
        assert!(!report.is_complete());

        let summary = report.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.in_progress, 2);
        assert_eq!(summary.dry_run, 1);
        assert_eq!(summary.complete, 1);
        assert_eq!(
            summary.to_string(),
            "4 resources (1 dry run, 2 in progress, 1 complete)"
        );
    }

    #[test]
    fn planned_delete_follows_mode() {
        assert_eq!(
            ReportItem::planned_delete("id", "n", true).action_status,
            ActionStatus::DryRun
        );
        assert_eq!(
            ReportItem::planned_delete("id", "n", false).action_status,
            ActionStatus::InProgress
        );
    }

    #[test]
    fn status_strings_match_serialized_form() {
        let report = Report::new(vec![
            item("a", "a", ActionStatus::DryRun),
            item("b", "b", ActionStatus::Empty),
        ]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["items"][0]["action"], "delete");
        assert_eq!(json["items"][0]["action_status"], "dry run");
        assert_eq!(json["items"][1]["action_status"], "");

        let parsed: Report = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, report);
    }
}
