//! crates/storycove_core/src/ports.rs
//!
//! Defines the error taxonomy shared by every operation and the one service
//! contract the core needs from the outside world (upload finalization).
//! Keeping these here lets the engine stay independent of how the calling
//! layer stores files or renders failures.

use async_trait::async_trait;

//=========================================================================================
// Core Error and Result Types
//=========================================================================================

/// The error taxonomy for all domain operations.
///
/// `NotFound` and `Forbidden` are domain-rule violations raised by the
/// operations themselves and propagate unchanged through the transaction
/// coordinator. `Conflict` is a uniqueness constraint lost to a concurrent
/// writer and is surfaced distinctly so the caller can retry the upsert.
/// `Storage` covers everything the caller cannot act on.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CoreError {
    /// True for failures the caller caused and can correct, as opposed to
    /// infrastructure trouble.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_) | CoreError::Forbidden(_) | CoreError::Conflict(_)
        )
    }
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Moves a staged upload to its final, id-derived name.
///
/// The engine invokes this strictly AFTER the surrounding transaction has
/// committed, so a failed rename can never strand a half-committed row; the
/// committed row already carries its final name and the rename is retryable.
#[async_trait]
pub trait UploadFinalizer: Send + Sync {
    /// Renames `staged` to `final_name`, returning the reference to persist.
    async fn finalize(&self, staged: &str, final_name: &str) -> CoreResult<String>;
}

/// Finalizer for callers that do not handle file uploads (and for tests):
/// accepts the final name as-is without touching any storage.
pub struct NoopFinalizer;

#[async_trait]
impl UploadFinalizer for NoopFinalizer {
    async fn finalize(&self, _staged: &str, final_name: &str) -> CoreResult<String> {
        Ok(final_name.to_string())
    }
}
