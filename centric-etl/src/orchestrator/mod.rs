//! Orchestrator module for the ETL.
//!
//! Runs a requested set of stages against one staging store session and
//! records the outcome as a run summary.

mod queue;

pub use queue::{QueueStatus, RunQueue};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use centric_etl_repository::{IndexLifecycle, PageFetcher, StagingStore, StoreConnector};
use centric_etl_shared::{RunSummary, Stage, StageSet, StagingCollection};
use chrono::Utc;
use futures::FutureExt;
use tracing::{error, info, instrument};

use crate::errors::EtlError;
use crate::extractor::Extractor;
use crate::loader::{BulkLoader, LoaderConfig};
use crate::timer::Timer;
use crate::transformer::{Transformer, DEFAULT_TRANSFORM_CONCURRENCY};

/// One queued pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub stages: StageSet,
    /// What requested the run (e.g. "schedule", "api", "cli").
    pub trigger: String,
}

impl RunRequest {
    pub fn new(stages: StageSet, trigger: impl Into<String>) -> Self {
        Self {
            stages,
            trigger: trigger.into(),
        }
    }
}

/// Executes one run to completion.
///
/// A run never fails from the caller's point of view: every error ends up in
/// the returned summary.
#[async_trait]
pub trait RunExecutor: Send + Sync {
    async fn execute(&self, request: RunRequest) -> RunSummary;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sequences joined concurrently during transform.
    pub transform_concurrency: usize,
    pub loader: LoaderConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            transform_concurrency: DEFAULT_TRANSFORM_CONCURRENCY,
            loader: LoaderConfig::default(),
        }
    }
}

/// Orchestrator that drives the extract, transform and load stages.
///
/// The orchestrator:
/// - Rejects stage sets that would load stale documents
/// - Opens one staging store session per run and always closes it
/// - Runs the requested stages in pipeline order, stopping at the first failure
/// - Persists exactly one run summary per run
pub struct Orchestrator {
    connector: Arc<dyn StoreConnector>,
    fetcher: Arc<dyn PageFetcher>,
    lifecycle: Arc<IndexLifecycle>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with the default stage settings.
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        fetcher: Arc<dyn PageFetcher>,
        lifecycle: Arc<IndexLifecycle>,
    ) -> Self {
        Self::with_config(connector, fetcher, lifecycle, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        connector: Arc<dyn StoreConnector>,
        fetcher: Arc<dyn PageFetcher>,
        lifecycle: Arc<IndexLifecycle>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            connector,
            fetcher,
            lifecycle,
            config,
        }
    }

    /// Run the requested stages and return the finished summary.
    #[instrument(skip(self, stages), fields(stages = %stages))]
    pub async fn run_stages(&self, stages: StageSet, trigger: &str) -> RunSummary {
        let timer = Timer::start();
        let mut summary = RunSummary::start(stages.clone(), trigger);
        info!(trigger = %trigger, "Starting run");

        if let Err(e) = stages.validate() {
            let e = EtlError::from(e);
            error!(error = %e, "Run rejected before any stage");
            summary.errors.push(e.to_string());
            return Self::finish(summary, &timer);
        }

        let store = match self.connector.connect().await {
            Ok(store) => store,
            Err(e) => {
                let e = EtlError::from(e);
                error!(error = %e, "Failed to open staging store session");
                summary.errors.push(e.to_string());
                return Self::finish(summary, &timer);
            }
        };

        let outcome = AssertUnwindSafe(self.run_requested(&store, &stages, &mut summary))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err((stage, e))) => {
                error!(stage = %stage, error = %e, "Run threw an error during stage");
                summary.errors.push(e.to_string());
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Run panicked during a stage");
                summary.errors.push(format!("Run panicked: {}", message));
            }
        }

        let summary = Self::finish(summary, &timer);
        Self::record_summary(&store, &summary).await;
        store.close().await;

        summary
    }

    /// Run each requested stage in pipeline order.
    async fn run_requested(
        &self,
        store: &Arc<dyn StagingStore>,
        stages: &StageSet,
        summary: &mut RunSummary,
    ) -> Result<(), (Stage, EtlError)> {
        for stage in stages.iter() {
            match stage {
                Stage::Extract => {
                    let extractor = Extractor::new(store.clone(), self.fetcher.clone());
                    summary.extract = Some(extractor.extract().await.map_err(|e| (stage, e))?);
                }
                Stage::Transform => {
                    let transformer = Transformer::with_concurrency(
                        store.clone(),
                        self.config.transform_concurrency,
                    );
                    summary.transform =
                        Some(transformer.transform().await.map_err(|e| (stage, e))?);
                }
                Stage::Load => {
                    let loader = BulkLoader::with_config(
                        store.clone(),
                        self.lifecycle.clone(),
                        self.config.loader.clone(),
                    );
                    summary.load = Some(loader.load().await.map_err(|e| (stage, e))?);
                }
            }
        }
        Ok(())
    }

    fn finish(mut summary: RunSummary, timer: &Timer) -> RunSummary {
        summary.duration = Some(timer.elapsed_ms());
        summary.end = Some(Utc::now());
        info!(
            succeeded = summary.succeeded(),
            errors = ?summary.errors,
            duration_ms = summary.duration,
            "Finished run"
        );
        summary
    }

    /// Append the summary to the run history. Failures are logged only.
    async fn record_summary(store: &Arc<dyn StagingStore>, summary: &RunSummary) {
        let value = match serde_json::to_value(summary) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to serialize run summary");
                return;
            }
        };
        if let Err(e) = store.insert_one(StagingCollection::Runs, &value).await {
            error!(error = %e, "Failed to record run summary");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl RunExecutor for Orchestrator {
    async fn execute(&self, request: RunRequest) -> RunSummary {
        self.run_stages(request.stages, &request.trigger).await
    }
}
