//! services/engine/src/context.rs
//!
//! The per-operation request context: who is calling, and which transactional
//! session their writes must go through.
//!
//! A `RequestContext` is an owned value created by the transaction coordinator
//! for exactly one inbound operation and threaded explicitly as the first
//! argument of every operation and repository call. Isolation between
//! concurrent operations is therefore structural: there is no thread-local or
//! task-local storage that one operation could leak into another through.

use sqlx::{PgConnection, Postgres, Transaction};
use storycove_core::{CoreError, CoreResult, User};

/// The capability set of the inbound caller.
///
/// Anonymous callers can reach the read paths; every mutation asks the
/// context for an authenticated [`User`] and fails with `Forbidden` when
/// there is none.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    User(User),
}

impl Caller {
    pub fn user(&self) -> Option<&User> {
        match self {
            Caller::Anonymous => None,
            Caller::User(user) => Some(user),
        }
    }
}

/// Holds, for the lifetime of one inbound operation, the caller identity and
/// the transactional session currently in effect.
pub struct RequestContext {
    caller: Caller,
    tx: Option<Transaction<'static, Postgres>>,
}

impl RequestContext {
    /// Creates a context with no transaction seeded yet. Write paths calling
    /// [`RequestContext::tx`] on such a context fail fast rather than
    /// silently using an un-transacted connection.
    pub fn new(caller: Caller) -> Self {
        Self { caller, tx: None }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The authenticated caller, or `Forbidden` for anonymous operations.
    pub fn user(&self) -> CoreResult<&User> {
        self.caller
            .user()
            .ok_or_else(|| CoreError::Forbidden("authentication required".to_string()))
    }

    /// Seeds the active transactional session. Called once by the
    /// coordinator when it opens the transaction.
    pub fn set_transaction(&mut self, tx: Transaction<'static, Postgres>) {
        self.tx = Some(tx);
    }

    /// Takes the session back out for commit or rollback.
    pub fn take_transaction(&mut self) -> Option<Transaction<'static, Postgres>> {
        self.tx.take()
    }

    /// The connection bound to the active transaction.
    ///
    /// Errors when no transaction is in effect; that is a coordinator bug,
    /// never a condition domain operations should tolerate.
    pub fn tx(&mut self) -> CoreResult<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(CoreError::Storage(
                "no active transaction in request context".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            profile_picture: None,
        }
    }

    #[test]
    fn anonymous_context_has_no_user() {
        let ctx = RequestContext::new(Caller::Anonymous);
        assert!(matches!(ctx.user(), Err(CoreError::Forbidden(_))));
    }

    #[test]
    fn tx_fails_fast_when_no_transaction_seeded() {
        let mut ctx = RequestContext::new(Caller::User(user("ada")));
        assert!(matches!(ctx.tx(), Err(CoreError::Storage(_))));
    }

    // Two operations running concurrently on the same runtime must never
    // observe each other's caller, even with interleaved suspension points.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_contexts_are_isolated() {
        let mut handles = Vec::new();
        for i in 0..16 {
            handles.push(tokio::spawn(async move {
                let name = format!("user-{i}");
                let ctx = RequestContext::new(Caller::User(user(&name)));
                for _ in 0..32 {
                    tokio::task::yield_now().await;
                    let seen = ctx.user().expect("own caller must be visible");
                    assert_eq!(seen.username, name);
                }
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked");
        }
    }
}
