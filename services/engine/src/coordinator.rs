//! services/engine/src/coordinator.rs
//!
//! Wraps one inbound operation in a database transaction so that all of its
//! writes commit atomically or not at all.
//!
//! Lifecycle: `Open -> {Committed | RolledBack}`. The pooled connection is
//! returned unconditionally: `commit()` and `rollback()` consume the sqlx
//! transaction, and the drop path releases the connection even when either
//! step itself errors, so nothing is ever held past the operation.

use crate::context::{Caller, RequestContext};
use futures::future::BoxFuture;
use sqlx::PgPool;
use storycove_core::{CoreError, CoreResult};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// Runs `op` inside a fresh transaction seeded into a [`RequestContext`].
///
/// On `Ok` the transaction commits; on `Err` it rolls back and the original
/// error is re-raised unchanged so the caller sees the true failure cause.
/// Commit and rollback failures surface as `Storage` errors, never silently
/// swallowed.
pub async fn within_transaction<T, F>(
    pool: &PgPool,
    caller: Caller,
    op_name: &'static str,
    op: F,
) -> CoreResult<T>
where
    F: for<'a> FnOnce(&'a mut RequestContext) -> BoxFuture<'a, CoreResult<T>>,
{
    let tx = pool
        .begin()
        .await
        .map_err(|e| CoreError::Storage(format!("could not open transaction: {e}")))?;
    let mut state = TxState::Open;
    debug!(op = op_name, ?state, "transaction started");

    let mut ctx = RequestContext::new(caller);
    ctx.set_transaction(tx);

    let outcome = op(&mut ctx).await;

    // An operation that consumes the handle itself would break the
    // commit-or-rollback guarantee; treat that as an engine bug.
    let tx = ctx.take_transaction().ok_or_else(|| {
        CoreError::Storage("transaction handle lost during operation".to_string())
    })?;

    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| CoreError::Storage(format!("commit failed: {e}")))?;
            state = TxState::Committed;
            debug!(op = op_name, ?state, "transaction committed");
            Ok(value)
        }
        Err(err) => {
            debug!(op = op_name, error = %err, "rolling back transaction after failure");
            if let Err(rollback_err) = tx.rollback().await {
                // The original failure still gets logged before the rollback
                // failure replaces it on the wire.
                error!(op = op_name, original = %err, "rollback failed: {rollback_err}");
                return Err(CoreError::Storage(format!(
                    "rollback failed: {rollback_err}"
                )));
            }
            state = TxState::RolledBack;
            debug!(op = op_name, ?state, "transaction rolled back");
            Err(err)
        }
    }
}
