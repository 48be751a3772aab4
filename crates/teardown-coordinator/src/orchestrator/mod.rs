//! Fan-out of one teardown cycle across every registered engine
//!
//! Engines run concurrently as separate tasks with identical arguments.
//! Results are joined in registration order, so the combined report is
//! deterministic regardless of which engine finishes first. A failing,
//! timed-out or panicking engine never stops the others.

mod error;

pub use error::{EngineFailure, TeardownError};

use crate::engine::{ClusterResourceManager, EngineError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use teardown_common::{Report, ReportItem};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one cycle: every item gathered, plus the failures if any
#[derive(Debug)]
pub struct TeardownOutcome {
    pub report: Report,
    /// Engine that reported each item, keyed by item id
    pub owners: HashMap<String, String>,
    pub error: Option<TeardownError>,
}

impl TeardownOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether `engine` failed this cycle, so its absent items prove nothing
    pub fn engine_failed(&self, engine: &str) -> bool {
        self.error
            .as_ref()
            .is_some_and(|error| error.failures.iter().any(|f| f.engine == engine))
    }

    /// Drop the partial report when any engine failed
    pub fn into_result(self) -> Result<Report, TeardownError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.report),
        }
    }
}

/// Runs a fixed, ordered set of engines against one cluster.
pub struct Orchestrator {
    engines: Vec<Arc<dyn ClusterResourceManager>>,
    cycle_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(engines: Vec<Arc<dyn ClusterResourceManager>>) -> Self {
        Self {
            engines,
            cycle_timeout: None,
        }
    }

    /// Bound every engine call of a cycle by the same deadline
    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = Some(timeout);
        self
    }

    /// Append an engine after the ones already registered
    pub fn register(&mut self, engine: Arc<dyn ClusterResourceManager>) {
        self.engines.push(engine);
    }

    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|engine| engine.name()).collect()
    }

    /// Run every engine once and combine their items.
    pub async fn delete_resources_for_cluster(
        &self,
        cluster_id: &str,
        tags: &HashMap<String, String>,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> TeardownOutcome {
        info!(
            cluster_id,
            dry_run,
            engines = self.engines.len(),
            "Starting teardown cycle"
        );

        let handles: Vec<_> = self
            .engines
            .iter()
            .map(|engine| {
                let name = engine.name();
                let engine = Arc::clone(engine);
                let cluster_id = cluster_id.to_string();
                let tags = tags.clone();
                let cancel = cancel.clone();
                let timeout = self.cycle_timeout;
                let handle = tokio::spawn(async move {
                    run_engine(engine, &cluster_id, &tags, dry_run, timeout, &cancel).await
                });
                (name, handle)
            })
            .collect();

        let mut items: Vec<ReportItem> = Vec::new();
        let mut owners = HashMap::new();
        let mut failures = Vec::new();
        for (engine, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(EngineError::Panicked(join_error.to_string())),
            };

            match result {
                Ok(engine_items) => {
                    debug!(engine = %engine, count = engine_items.len(), "Engine finished");
                    for item in &engine_items {
                        owners.insert(item.id.clone(), engine.clone());
                    }
                    items.extend(engine_items);
                }
                Err(error) => {
                    warn!(engine = %engine, error = %error, "Engine failed");
                    failures.push(EngineFailure { engine, error });
                }
            }
        }

        let report = Report::new(items);
        info!(
            cluster_id,
            summary = %report.summary(),
            failed = failures.len(),
            "Teardown cycle finished"
        );

        let error = (!failures.is_empty()).then(|| TeardownError {
            failures,
            attempted: self.engines.len(),
        });
        TeardownOutcome {
            report,
            owners,
            error,
        }
    }
}

async fn run_engine(
    engine: Arc<dyn ClusterResourceManager>,
    cluster_id: &str,
    tags: &HashMap<String, String>,
    dry_run: bool,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<Vec<ReportItem>, EngineError> {
    let work = engine.delete_resources_for_cluster(cluster_id, tags, dry_run);
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout(limit)),
            },
            None => work.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        result = bounded => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockClusterResourceManager;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use teardown_common::ActionStatus;
    use teardown_test_utils::{TEST_CLUSTER_ID, item};

    /// Scripted engine for ordering, panic and timing tests
    struct FakeEngine {
        name: &'static str,
        delay: Duration,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    enum Behavior {
        Items(Vec<ReportItem>),
        Fail,
        Panic,
    }

    impl FakeEngine {
        fn new(name: &'static str, behavior: Behavior) -> Self {
            Self {
                name,
                delay: Duration::ZERO,
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ClusterResourceManager for FakeEngine {
        fn name(&self) -> String {
            self.name.to_string()
        }

        async fn delete_resources_for_cluster(
            &self,
            _cluster_id: &str,
            _tags: &HashMap<String, String>,
            _dry_run: bool,
        ) -> Result<Vec<ReportItem>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.behavior {
                Behavior::Items(items) => Ok(items.clone()),
                Behavior::Fail => Err(EngineError::Describe {
                    what: "things",
                    source: anyhow::anyhow!("boom"),
                }),
                Behavior::Panic => panic!("engine exploded"),
            }
        }
    }

    fn items(ids: &[&str]) -> Behavior {
        Behavior::Items(
            ids.iter()
                .map(|id| item(id, id, ActionStatus::InProgress))
                .collect(),
        )
    }

    async fn run(orchestrator: &Orchestrator) -> TeardownOutcome {
        orchestrator
            .delete_resources_for_cluster(
                TEST_CLUSTER_ID,
                &HashMap::new(),
                false,
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn items_follow_registration_order() {
        // The slow first engine finishes last but is still listed first
        let orchestrator = Orchestrator::new(vec![
            Arc::new(FakeEngine::new("a", items(&["a1", "a2"])).delayed(Duration::from_millis(50))),
            Arc::new(FakeEngine::new("b", items(&["b1"]))),
        ]);

        let outcome = run(&orchestrator).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.owners["a2"], "a");
        assert_eq!(outcome.owners["b1"], "b");
        let ids: Vec<_> = outcome.report.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a1", "a2", "b1"]);
    }

    #[tokio::test]
    async fn failing_engine_does_not_stop_others() {
        let healthy = Arc::new(FakeEngine::new("healthy", items(&["h1"])));
        let orchestrator = Orchestrator::new(vec![
            Arc::new(FakeEngine::new("broken", Behavior::Fail)),
            healthy.clone(),
            Arc::new(FakeEngine::new("also-broken", Behavior::Fail)),
        ]);

        let outcome = run(&orchestrator).await;
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.report.len(), 1);
        assert!(outcome.engine_failed("broken"));
        assert!(!outcome.engine_failed("healthy"));

        let error = outcome.error.unwrap();
        assert_eq!(error.attempted, 3);
        assert_eq!(error.failed_engines(), ["broken", "also-broken"]);
        assert!(error.to_string().contains("broken: failed to describe things: boom"));
    }

    #[tokio::test]
    async fn panicking_engine_is_reported_as_failure() {
        let orchestrator = Orchestrator::new(vec![
            Arc::new(FakeEngine::new("panicky", Behavior::Panic)),
            Arc::new(FakeEngine::new("fine", items(&["f1"]))),
        ]);

        let outcome = run(&orchestrator).await;
        assert_eq!(outcome.report.len(), 1);
        let error = outcome.error.unwrap();
        assert!(matches!(error.failures[0].error, EngineError::Panicked(_)));
    }

    #[tokio::test]
    async fn cycle_timeout_applies_to_every_engine() {
        let orchestrator = Orchestrator::new(vec![
            Arc::new(FakeEngine::new("slow", items(&["s1"])).delayed(Duration::from_secs(30))),
            Arc::new(FakeEngine::new("quick", items(&["q1"]))),
        ])
        .with_cycle_timeout(Duration::from_millis(50));

        let outcome = run(&orchestrator).await;
        assert_eq!(outcome.report.items[0].id, "q1");
        let error = outcome.error.unwrap();
        assert_eq!(error.failed_engines(), ["slow"]);
        assert!(matches!(error.failures[0].error, EngineError::Timeout(_)));
    }

    #[tokio::test]
    async fn cancellation_reaches_every_engine() {
        let orchestrator = Orchestrator::new(vec![
            Arc::new(FakeEngine::new("a", items(&["a1"])).delayed(Duration::from_secs(30))),
            Arc::new(FakeEngine::new("b", items(&["b1"])).delayed(Duration::from_secs(30))),
        ]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = orchestrator
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &HashMap::new(), false, &cancel)
            .await;
        assert!(outcome.report.is_empty());
        let error = outcome.error.unwrap();
        assert_eq!(error.failures.len(), 2);
        assert!(
            error
                .failures
                .iter()
                .all(|f| matches!(f.error, EngineError::Cancelled))
        );
    }

    #[tokio::test]
    async fn every_engine_gets_identical_arguments() {
        let tags = HashMap::from([("env".to_string(), "prod".to_string())]);
        let engines: Vec<Arc<dyn ClusterResourceManager>> = ["first", "second"]
            .into_iter()
            .map(|name| {
                let mut engine = MockClusterResourceManager::new();
                engine.expect_name().return_const(name.to_string());
                engine
                    .expect_delete_resources_for_cluster()
                    .withf(|cluster_id, tags, dry_run| {
                        cluster_id == TEST_CLUSTER_ID
                            && tags.get("env").map(String::as_str) == Some("prod")
                            && *dry_run
                    })
                    .times(1)
                    .returning(|_, _, _| Ok(Vec::new()));
                Arc::new(engine) as Arc<dyn ClusterResourceManager>
            })
            .collect();
        let orchestrator = Orchestrator::new(engines);
        assert_eq!(orchestrator.engine_names(), ["first", "second"]);

        let outcome = orchestrator
            .delete_resources_for_cluster(TEST_CLUSTER_ID, &tags, true, &CancellationToken::new())
            .await;
        assert!(outcome.into_result().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_engines_yields_empty_report() {
        let mut orchestrator = Orchestrator::new(Vec::new());
        assert!(run(&orchestrator).await.report.is_empty());

        orchestrator.register(Arc::new(FakeEngine::new("late", items(&["l1"]))));
        assert_eq!(run(&orchestrator).await.report.len(), 1);
    }
}
