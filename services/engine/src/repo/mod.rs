//! services/engine/src/repo/mod.rs
//!
//! One repository module per entity. Every function takes the transactional
//! connection handed out by the request context as its first argument, so a
//! multi-table operation runs all of its statements on the one session the
//! coordinator will commit or roll back.
//!
//! Queries are runtime-checked (`sqlx::query` / `sqlx::query_as` with
//! `FromRow` record structs converted via `to_domain`), so the crate builds
//! without a live database.

pub mod categories;
pub mod comments;
pub mod pages;
pub mod ratings;
pub mod readers;
pub mod stories;
pub mod users;

use storycove_core::CoreError;

/// Maps a database error into the core taxonomy. Uniqueness violations
/// become `Conflict` so a racing upsert's loser can retry; everything else
/// is opaque `Storage`.
pub(crate) fn storage_err(err: sqlx::Error) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return CoreError::Conflict(db_err.message().to_string());
        }
    }
    CoreError::Storage(err.to_string())
}
