//! One cluster's teardown across cycles
//!
//! Couples the orchestrator with reconciliation and optional persistence:
//! every cycle runs the engines, merges the fresh report into the last
//! published one and stores the result for the next cycle or run.

use crate::orchestrator::{Orchestrator, TeardownError};
use crate::reconcile::{Reconciler, ReportStore, StoredReport};
use crate::wait::{PollConfig, PollOutcome, poll_until};
use anyhow::Result;
use std::collections::HashMap;
use teardown_common::Report;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What one cycle produced
#[derive(Debug)]
pub struct CycleResult {
    /// Items discovered by this cycle alone
    pub fresh: Report,
    /// Report to show and persist
    pub published: Report,
    pub error: Option<TeardownError>,
}

impl CycleResult {
    /// Nothing left to delete and every engine answered
    pub fn is_finished(&self) -> bool {
        self.error.is_none() && self.fresh.is_empty()
    }
}

pub struct TeardownRunner {
    orchestrator: Orchestrator,
    reconciler: Reconciler,
    store: Option<ReportStore>,
    cluster_id: String,
    tags: HashMap<String, String>,
    dry_run: bool,
    published: Mutex<Option<Report>>,
    /// Engine that last reported each published item
    owners: Mutex<HashMap<String, String>>,
}

impl TeardownRunner {
    pub fn new(
        orchestrator: Orchestrator,
        cluster_id: impl Into<String>,
        tags: HashMap<String, String>,
        dry_run: bool,
    ) -> Self {
        Self {
            orchestrator,
            reconciler: Reconciler::default(),
            store: None,
            cluster_id: cluster_id.into(),
            tags,
            dry_run,
            published: Mutex::new(None),
            owners: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Persist every published report, starting from the one already stored.
    pub fn with_store(mut self, store: ReportStore) -> Result<Self> {
        let previous = store.load_for(&self.cluster_id)?;
        if let Some(stored) = &previous {
            info!(
                path = %store.path().display(),
                updated_at = %stored.updated_at,
                summary = %stored.report.summary(),
                "Resuming from stored report"
            );
        }
        let (report, owners) = previous
            .map(|stored| (Some(stored.report), stored.owners))
            .unwrap_or_default();
        self.published = Mutex::new(report);
        self.owners = Mutex::new(owners);
        self.store = Some(store);
        Ok(self)
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The last published report, if any cycle ran or a stored one was loaded
    pub async fn published(&self) -> Option<Report> {
        self.published.lock().await.clone()
    }

    /// Run the engines once and publish the reconciled report.
    ///
    /// Engine failures are returned inside the result; `Err` means the
    /// report could not be stored.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleResult> {
        let outcome = self
            .orchestrator
            .delete_resources_for_cluster(&self.cluster_id, &self.tags, self.dry_run, cancel)
            .await;

        let mut published_slot = self.published.lock().await;
        let mut owners = self.owners.lock().await;
        owners.extend(outcome.owners.clone());

        let published = if outcome.is_success() {
            self.reconciler
                .reconcile(published_slot.as_ref(), outcome.report.clone())
        } else {
            // Unknown owners are held too: a stored report may predate them
            self.reconciler.reconcile_partial(
                published_slot.as_ref(),
                outcome.report.clone(),
                |item| {
                    owners
                        .get(&item.id)
                        .is_none_or(|engine| outcome.engine_failed(engine))
                },
            )
        };
        owners.retain(|id, _| published.get(id).is_some());

        if let Some(store) = &self.store {
            store.save(
                &StoredReport::new(&self.cluster_id, self.dry_run, published.clone())
                    .with_owners(owners.clone()),
            )?;
        }
        *published_slot = Some(published.clone());

        if let Some(error) = &outcome.error {
            warn!(cluster_id = %self.cluster_id, "{error}");
        }
        info!(
            cluster_id = %self.cluster_id,
            discovered = outcome.report.len(),
            summary = %published.summary(),
            "Published teardown report"
        );

        Ok(CycleResult {
            fresh: outcome.report,
            published,
            error: outcome.error,
        })
    }

    /// Repeat cycles until nothing is left, time runs out or `cancel` fires.
    ///
    /// A dry run never changes anything, so it stops after one cycle.
    pub async fn watch(
        &self,
        config: PollConfig,
        cancel: &CancellationToken,
    ) -> Result<(PollOutcome, Option<CycleResult>)> {
        let last: Mutex<Option<CycleResult>> = Mutex::new(None);

        let outcome = poll_until(
            config,
            cancel,
            || {
                let last = &last;
                async move {
                    let cycle = self.run_cycle(cancel).await?;
                    let finished = self.dry_run || cycle.is_finished();
                    *last.lock().await = Some(cycle);
                    Ok(finished)
                }
            },
            "cluster teardown",
        )
        .await?;

        Ok((outcome, last.into_inner()))
    }
}
