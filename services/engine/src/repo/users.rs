//! services/engine/src/repo/users.rs

use crate::repo::storage_err;
use sqlx::{FromRow, PgConnection};
use storycove_core::{CoreResult, User, UserCredentials};
use uuid::Uuid;

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    profile_picture: Option<String>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            profile_picture: self.profile_picture,
        }
    }
}

/// Inserts a user row. Duplicate username or email surfaces as `Conflict`.
pub async fn insert(conn: &mut PgConnection, creds: &UserCredentials) -> CoreResult<User> {
    let record = sqlx::query_as::<_, UserRecord>(
        "INSERT INTO users (id, username, email, password_hash, profile_picture) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, username, email, profile_picture",
    )
    .bind(creds.id)
    .bind(&creds.username)
    .bind(&creds.email)
    .bind(&creds.password_hash)
    .bind(&creds.profile_picture)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> CoreResult<Option<User>> {
    let record = sqlx::query_as::<_, UserRecord>(
        "SELECT id, username, email, profile_picture FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.map(UserRecord::to_domain))
}
