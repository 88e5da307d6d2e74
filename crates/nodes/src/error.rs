//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// The handler framework uses the variant to decide what happens next:
/// - `Retryable` — the underlying message is nacked and redelivered, up to
///   the broker's configured retry cap.
/// - `Fatal` — the node (and therefore the run) fails immediately, no
///   retry attempted.
///
/// AI-provider unavailability is *not* an error: `ai.*` handlers return
/// `Ok(NodeOutput { fallback: true, .. })` instead (see the AI fallback
/// rule in the per-type contracts).
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the engine should re-try the job.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

/// Errors surfaced by a provider port (AI, messaging, spreadsheet, email,
/// SMS, file resolution, document storage). Handlers translate these into
/// [`NodeError`] — usually `Retryable`, unless the handler judges the
/// failure fallback-eligible.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    RequestFailed(String),

    #[error("provider returned an unexpected response: {0}")]
    BadResponse(String),

    #[error("not found: {0}")]
    NotFound(String),
}
