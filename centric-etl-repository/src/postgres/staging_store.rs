//! PostgreSQL implementation of the staging store.
//!
//! Every collection lives in the single `staged_documents` table, keyed by the
//! collection name, with the document stored as JSONB. Filters on the join keys
//! (`sequence_id`, `sample_id`, `host_id`) are served by expression indexes.

use std::collections::VecDeque;

use async_trait::async_trait;
use centric_etl_shared::StagingCollection;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use sqlx::types::Json;
use tracing::debug;

use crate::errors::StagingStoreError;
use crate::interfaces::{DocumentStream, StagingStore};
use crate::types::Filter;

/// Rows fetched per round trip while streaming a collection.
const FIND_BATCH_SIZE: i64 = 500;

/// Rows per INSERT statement. Two bind parameters per row keeps this well
/// below the PostgreSQL limit of 65535 parameters.
const INSERT_CHUNK_SIZE: usize = 1000;

/// PostgreSQL-backed staging store session.
///
/// Owns the connection pool opened for one run; [`StagingStore::close`] shuts
/// the pool down.
pub struct PostgresStagingStore {
    /// PostgreSQL connection pool
    pool: sqlx::PgPool,
}

impl PostgresStagingStore {
    /// Creates a new staging store session over a migrated pool.
    ///
    /// # Arguments
    ///
    /// * `pool` - Connection pool with the `staged_documents` table in place
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

/// The WHERE clause selecting the documents of one collection.
///
/// `$1` is always the collection name; a field filter adds `$2` for its value.
/// The field name is inlined so the planner can use the expression indexes,
/// which is why it is restricted to identifier characters.
struct Selection {
    clause: String,
    value: Option<String>,
}

impl Selection {
    fn new(filter: &Filter) -> Result<Self, StagingStoreError> {
        match filter {
            Filter::All => Ok(Self {
                clause: "collection = $1".to_string(),
                value: None,
            }),
            Filter::FieldEquals { field, value } => {
                if field.is_empty()
                    || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(StagingStoreError::invalid_document(format!(
                        "Unsupported filter field: {}",
                        field
                    )));
                }
                Ok(Self {
                    clause: format!("collection = $1 AND body ->> '{}' = $2", field),
                    value: Some(value.clone()),
                })
            }
        }
    }

    /// Position of the next free bind parameter.
    fn next_param(&self) -> usize {
        if self.value.is_some() {
            3
        } else {
            2
        }
    }
}

/// Keyset cursor over one `find` call.
struct FindCursor {
    pool: sqlx::PgPool,
    sql: String,
    collection: &'static str,
    value: Option<String>,
    last_id: i64,
    buffer: VecDeque<Value>,
    exhausted: bool,
}

impl FindCursor {
    async fn fill(&mut self) -> Result<(), StagingStoreError> {
        let mut query = sqlx::query_as::<_, (i64, Json<Value>)>(&self.sql).bind(self.collection);
        if let Some(value) = &self.value {
            query = query.bind(value.clone());
        }
        let rows = query.bind(self.last_id).fetch_all(&self.pool).await?;

        if (rows.len() as i64) < FIND_BATCH_SIZE {
            self.exhausted = true;
        }
        for (id, Json(body)) in rows {
            self.last_id = id;
            self.buffer.push_back(body);
        }
        Ok(())
    }
}

fn ensure_object(document: &Value) -> Result<(), StagingStoreError> {
    if document.is_object() {
        Ok(())
    } else {
        Err(StagingStoreError::invalid_document(
            "staged documents must be JSON objects",
        ))
    }
}

#[async_trait]
impl StagingStore for PostgresStagingStore {
    async fn delete_many(
        &self,
        collection: StagingCollection,
        filter: &Filter,
    ) -> Result<u64, StagingStoreError> {
        let selection = Selection::new(filter)?;
        let sql = format!("DELETE FROM staged_documents WHERE {}", selection.clause);

        let mut query = sqlx::query(&sql).bind(collection.name());
        if let Some(value) = &selection.value {
            query = query.bind(value.as_str());
        }
        let result = query.execute(&self.pool).await?;

        debug!(collection = %collection, deleted = result.rows_affected(), "Deleted staged documents");
        Ok(result.rows_affected())
    }

    async fn insert_many(
        &self,
        collection: StagingCollection,
        documents: &[Value],
    ) -> Result<(), StagingStoreError> {
        if documents.is_empty() {
            return Ok(());
        }
        for document in documents {
            ensure_object(document)?;
        }

        let mut tx = self.pool.begin().await?;
        for chunk in documents.chunks(INSERT_CHUNK_SIZE) {
            let mut query_builder =
                sqlx::QueryBuilder::new("INSERT INTO staged_documents (collection, body) ");
            query_builder.push_values(chunk, |mut b, document| {
                b.push_bind(collection.name()).push_bind(Json(document.clone()));
            });
            query_builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn insert_one(
        &self,
        collection: StagingCollection,
        document: &Value,
    ) -> Result<(), StagingStoreError> {
        ensure_object(document)?;

        sqlx::query("INSERT INTO staged_documents (collection, body) VALUES ($1, $2)")
            .bind(collection.name())
            .bind(Json(document.clone()))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn find(&self, collection: StagingCollection, filter: Filter) -> DocumentStream<'_> {
        let selection = match Selection::new(&filter) {
            Ok(selection) => selection,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };
        let sql = format!(
            "SELECT id, body FROM staged_documents WHERE {} AND id > ${} ORDER BY id LIMIT {}",
            selection.clause,
            selection.next_param(),
            FIND_BATCH_SIZE
        );

        let cursor = FindCursor {
            pool: self.pool.clone(),
            sql,
            collection: collection.name(),
            value: selection.value,
            last_id: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(document) = cursor.buffer.pop_front() {
                    return Ok::<_, StagingStoreError>(Some((document, cursor)));
                }
                if cursor.exhausted {
                    return Ok(None);
                }
                cursor.fill().await?;
            }
        })
        .boxed()
    }

    async fn find_one(
        &self,
        collection: StagingCollection,
        filter: &Filter,
    ) -> Result<Option<Value>, StagingStoreError> {
        let selection = Selection::new(filter)?;
        let sql = format!(
            "SELECT body FROM staged_documents WHERE {} ORDER BY id LIMIT 1",
            selection.clause
        );

        let mut query = sqlx::query_scalar::<_, Json<Value>>(&sql).bind(collection.name());
        if let Some(value) = &selection.value {
            query = query.bind(value.as_str());
        }
        let row = query.fetch_optional(&self.pool).await?;

        Ok(row.map(|Json(body)| body))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
