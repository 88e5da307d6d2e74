//! Document repository functions, and the Postgres `DocumentSink` adapter
//! `ingest.*` handlers write through.

use async_trait::async_trait;
use nodes::error::ProviderError;
use nodes::ports::{DocumentSink, NewDocument};
use sqlx::PgPool;

use crate::{models::DocumentRow, DbError};

pub async fn insert_document(pool: &PgPool, doc: &NewDocument) -> Result<DocumentRow, DbError> {
    let id = engine::id::new_id();
    let now = chrono::Utc::now();

    let row = sqlx::query_as!(
        DocumentRow,
        r#"
        INSERT INTO documents (id, doc_type, content, metadata, run_id, node_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, doc_type, content, metadata, run_id, node_id, created_at
        "#,
        id,
        doc.doc_type,
        doc.content,
        doc.metadata,
        doc.run_id,
        doc.node_id,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_document(pool: &PgPool, id: &str) -> Result<DocumentRow, DbError> {
    sqlx::query_as!(
        DocumentRow,
        r#"SELECT id, doc_type, content, metadata, run_id, node_id, created_at FROM documents WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Postgres-backed [`DocumentSink`] — the production adapter handed to
/// `ExecutionContext` by the `cli` worker's `ContextFactory`.
pub struct PgDocuments {
    pool: PgPool,
}

impl PgDocuments {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentSink for PgDocuments {
    async fn store(&self, doc: NewDocument) -> Result<String, ProviderError> {
        insert_document(&self.pool, &doc)
            .await
            .map(|row| row.id)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }

    async fn content_of(&self, document_id: &str) -> Result<String, ProviderError> {
        match get_document(&self.pool, document_id).await {
            Ok(row) => Ok(row.content),
            Err(DbError::NotFound) => Err(ProviderError::NotFound(document_id.to_string())),
            Err(e) => Err(ProviderError::RequestFailed(e.to_string())),
        }
    }
}
