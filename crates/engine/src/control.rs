//! The four external boundary operations (§4.5): create is a plain
//! `RunStore` insert the API handler performs directly (no engine logic
//! involved); the other three live here since they touch orchestration
//! state.

use crate::models::LogLevel;
use crate::store::{log, RunStore};
use crate::EngineError;

/// `POST /runs/{id}/cancel`. Writes `status = cancelled` only from a
/// non-terminal state (§4.5); the engine does not wait for in-flight
/// handlers to observe it (§5, cooperative cancellation).
///
/// Returns `true` if this call performed the transition, `false` if the
/// run was already terminal (the API layer maps that to 400).
pub async fn cancel_run(store: &dyn RunStore, run_id: &str) -> Result<bool, EngineError> {
    let cancelled = store.finalize_cancelled(run_id).await?;
    if cancelled {
        log(store, run_id, None, LogLevel::Warn, "run cancelled", None).await?;
    }
    Ok(cancelled)
}
