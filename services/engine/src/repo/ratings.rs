//! services/engine/src/repo/ratings.rs

use crate::repo::storage_err;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use storycove_core::{CoreResult, Rating};
use uuid::Uuid;

#[derive(FromRow)]
struct RatingRecord {
    id: Uuid,
    user_id: Uuid,
    story_id: Uuid,
    rate: i32,
    created_at: DateTime<Utc>,
}

impl RatingRecord {
    fn to_domain(self) -> Rating {
        Rating {
            id: self.id,
            user_id: self.user_id,
            story_id: self.story_id,
            rate: self.rate,
            created_at: self.created_at,
        }
    }
}

/// The caller's existing rating of the story, if any. Runs on the same
/// transaction as the write that follows it, so the lookup-then-write upsert
/// cannot silently double-insert; the unique constraint backstops the race.
pub async fn find_for(
    conn: &mut PgConnection,
    user_id: Uuid,
    story_id: Uuid,
) -> CoreResult<Option<Rating>> {
    let record = sqlx::query_as::<_, RatingRecord>(
        "SELECT id, user_id, story_id, rate, created_at \
         FROM ratings WHERE user_id = $1 AND story_id = $2",
    )
    .bind(user_id)
    .bind(story_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.map(RatingRecord::to_domain))
}

/// First-time rating insert. A concurrent duplicate surfaces as `Conflict`
/// via the `(user_id, story_id)` unique constraint.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    story_id: Uuid,
    rate: i32,
) -> CoreResult<Rating> {
    let record = sqlx::query_as::<_, RatingRecord>(
        "INSERT INTO ratings (id, user_id, story_id, rate) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, user_id, story_id, rate, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(story_id)
    .bind(rate)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

/// Overwrites the rate value of an existing rating row in place.
pub async fn update_rate(conn: &mut PgConnection, id: Uuid, rate: i32) -> CoreResult<Rating> {
    let record = sqlx::query_as::<_, RatingRecord>(
        "UPDATE ratings SET rate = $2 WHERE id = $1 \
         RETURNING id, user_id, story_id, rate, created_at",
    )
    .bind(id)
    .bind(rate)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn list_for_story(conn: &mut PgConnection, story_id: Uuid) -> CoreResult<Vec<Rating>> {
    let records = sqlx::query_as::<_, RatingRecord>(
        "SELECT id, user_id, story_id, rate, created_at FROM ratings WHERE story_id = $1",
    )
    .bind(story_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(records.into_iter().map(RatingRecord::to_domain).collect())
}
