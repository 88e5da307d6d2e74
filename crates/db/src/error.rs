//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid stored JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Generic fallback conversion for call sites with no more specific
/// context (e.g. `not found` surfaced mid-CAS, which is always a
/// programming error rather than a missing-entity 404 since every CAS
/// method is only ever called with an id the caller already loaded).
/// Call sites that *do* know which entity was missing (`load_run`,
/// `load_workflow`) match on `DbError::NotFound` themselves and return
/// the precise `EngineError::RunNotFound`/`WorkflowNotFound` instead of
/// going through this impl.
impl From<DbError> for engine::EngineError {
    fn from(e: DbError) -> Self {
        engine::EngineError::Store(e.to_string())
    }
}
