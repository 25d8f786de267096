//! services/engine/src/seed.rs
//!
//! Small data-seeding helpers for local setup and the integration tests.
//! These go through the repositories on short transactions of their own; the
//! engine proper never creates users (authentication is the calling layer's
//! job and hands us already-known identities).

use crate::repo::users;
use sqlx::PgPool;
use storycove_core::{CoreError, CoreResult, User, UserCredentials};
use uuid::Uuid;

/// Inserts a user with a throwaway password hash and returns the public
/// identity.
pub async fn create_user(pool: &PgPool, username: &str) -> CoreResult<User> {
    let creds = UserCredentials {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "seed-only".to_string(),
        profile_picture: None,
    };
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;
    let user = users::insert(&mut tx, &creds).await?;
    tx.commit()
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;
    Ok(user)
}
