//! PostgreSQL backend for the staging store.
//!
//! The connector opens one pool per run, applies the embedded migrations and
//! hands out a [`PostgresStagingStore`] session over it.

mod staging_store;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::errors::StagingStoreError;
use crate::interfaces::{StagingStore, StoreConnector};

pub use staging_store::PostgresStagingStore;

/// Schema migrations for the `staged_documents` table.
pub static MIGRATOR: Migrator = sqlx::migrate!("src/postgres/migrations");

/// Opens PostgreSQL staging store sessions.
pub struct PostgresConnector {
    database_url: String,
    max_connections: u32,
}

impl PostgresConnector {
    /// # Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Pool size of each session
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
        }
    }
}

#[async_trait]
impl StoreConnector for PostgresConnector {
    async fn connect(&self) -> Result<Arc<dyn StagingStore>, StagingStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;
        MIGRATOR.run(&pool).await?;

        info!(max_connections = self.max_connections, "Opened staging store session");
        Ok(Arc::new(PostgresStagingStore::new(pool)))
    }
}
