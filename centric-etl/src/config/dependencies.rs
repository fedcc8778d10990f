//! Dependency initialization and wiring for the ETL.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::EtlConfig;
use crate::errors::ServiceError;
use crate::orchestrator::{Orchestrator, RunQueue};
use crate::schedule::RunSchedule;
use centric_etl_repository::{
    DataConnectClient, IndexLifecycle, IndexLifecycleConfig, OpenSearchProvider,
    PostgresConnector, RollcallClient, SearchIndexProvider,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub config: EtlConfig,
    /// The single-flight queue every run goes through.
    pub queue: Arc<RunQueue>,
    /// The recurring all-stages job, inactive until activated.
    pub schedule: Arc<RunSchedule>,
}

impl Dependencies {
    /// Build every client from the configuration and start the run queue.
    ///
    /// No connection is opened to the staging store here: each run opens and
    /// closes its own session. The search cluster is pinged once so that a
    /// misconfigured `ES_HOST` shows up at startup, but an unreachable cluster
    /// does not prevent the service from starting.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn new(config: EtlConfig) -> Result<Self, ServiceError> {
        info!(
            data_table_host = %config.data_table_host,
            data_table_prefix = %config.data_table_prefix,
            search_url = %config.search.url,
            rollcall_host = %config.rollcall_host,
            rollcall_alias = %config.rollcall_alias,
            rollcall_entity = %config.rollcall_entity,
            "Initializing dependencies"
        );

        let connector = Arc::new(PostgresConnector::new(
            config.database_url.clone(),
            config.database_max_connections,
        ));

        let fetcher = Arc::new(DataConnectClient::new(
            config.data_table_host.clone(),
            config.data_table_prefix.clone(),
        ));

        let provider = OpenSearchProvider::new(&config.search).map_err(|e| {
            ServiceError::config(format!("Failed to create OpenSearch provider: {}", e))
        })?;
        if let Err(e) = provider.ping().await {
            warn!(search_url = %config.search.url, error = %e, "Search cluster is not reachable yet");
        }

        let registry = Arc::new(RollcallClient::new(config.rollcall_host.clone()));
        let lifecycle = Arc::new(IndexLifecycle::new(
            registry,
            Arc::new(provider),
            IndexLifecycleConfig::new(config.rollcall_alias.clone(), config.rollcall_entity.clone())
                .with_strict_mapping(config.strict_index_mapping),
        ));

        let orchestrator = Orchestrator::new(connector, fetcher, lifecycle);
        let queue = Arc::new(RunQueue::start(Arc::new(orchestrator)));
        let schedule = Arc::new(RunSchedule::new(queue.clone(), config.schedule.clone()));

        info!("Dependencies initialized");

        Ok(Self {
            config,
            queue,
            schedule,
        })
    }
}
