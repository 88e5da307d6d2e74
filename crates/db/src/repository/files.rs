//! Uploaded-file lookups, and the Postgres `FileResolver` adapter
//! `ingest.pdf` resolves file references through.
//!
//! Upload CRUD itself is out of scope (§3) — this only covers looking a
//! previously-uploaded file up by id and turning its bytes into text,
//! which `ingest.pdf`'s contract requires.

use async_trait::async_trait;
use nodes::error::ProviderError;
use nodes::ports::FileResolver;
use sqlx::PgPool;

use crate::{models::UploadedFileRow, DbError};

pub async fn get_uploaded_file(pool: &PgPool, id: &str) -> Result<UploadedFileRow, DbError> {
    sqlx::query_as!(
        UploadedFileRow,
        r#"SELECT id, owner_id, original_filename, storage_path, content_type, size_bytes, created_at
           FROM uploaded_files WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

fn extract_text(content_type: &str, bytes: &[u8]) -> Result<String, ProviderError> {
    if content_type == "application/pdf" {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ProviderError::BadResponse(format!("pdf extraction failed: {e}")))
    } else {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProviderError::BadResponse(format!("file is not valid UTF-8 text: {e}")))
    }
}

/// Postgres-backed [`FileResolver`]. `file_ref` is the `uploaded_files.id`
/// given in an `ingest.pdf` node's `file_id` config.
pub struct PgFiles {
    pool: PgPool,
}

impl PgFiles {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileResolver for PgFiles {
    async fn resolve_text(&self, file_ref: &str) -> Result<String, ProviderError> {
        let row = match get_uploaded_file(&self.pool, file_ref).await {
            Ok(row) => row,
            Err(DbError::NotFound) => return Err(ProviderError::NotFound(file_ref.to_string())),
            Err(e) => return Err(ProviderError::RequestFailed(e.to_string())),
        };

        let bytes = tokio::fs::read(&row.storage_path)
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("reading {}: {e}", row.storage_path)))?;

        extract_text(&row.content_type, &bytes)
    }
}
