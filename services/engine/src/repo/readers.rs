//! services/engine/src/repo/readers.rs
//!
//! One row per (user, story) holding the user's current page. The schema
//! evolved from one-row-per-page-visited; only the per-story row survives.

use crate::repo::storage_err;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use storycove_core::{CoreResult, Reader};
use uuid::Uuid;

#[derive(FromRow)]
struct ReaderRecord {
    id: Uuid,
    user_id: Uuid,
    story_id: Uuid,
    current_page_number: i32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl ReaderRecord {
    fn to_domain(self) -> Reader {
        Reader {
            id: self.id,
            user_id: self.user_id,
            story_id: self.story_id,
            current_page_number: self.current_page_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub async fn find_for(
    conn: &mut PgConnection,
    user_id: Uuid,
    story_id: Uuid,
) -> CoreResult<Option<Reader>> {
    let record = sqlx::query_as::<_, ReaderRecord>(
        "SELECT id, user_id, story_id, current_page_number, created_at, updated_at \
         FROM readers WHERE user_id = $1 AND story_id = $2",
    )
    .bind(user_id)
    .bind(story_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.map(ReaderRecord::to_domain))
}

pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    story_id: Uuid,
    current_page_number: i32,
) -> CoreResult<Reader> {
    let record = sqlx::query_as::<_, ReaderRecord>(
        "INSERT INTO readers (id, user_id, story_id, current_page_number) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, user_id, story_id, current_page_number, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(story_id)
    .bind(current_page_number)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn update_progress(
    conn: &mut PgConnection,
    id: Uuid,
    current_page_number: i32,
) -> CoreResult<Reader> {
    let record = sqlx::query_as::<_, ReaderRecord>(
        "UPDATE readers SET current_page_number = $2, updated_at = now() WHERE id = $1 \
         RETURNING id, user_id, story_id, current_page_number, created_at, updated_at",
    )
    .bind(id)
    .bind(current_page_number)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn list_for_story(conn: &mut PgConnection, story_id: Uuid) -> CoreResult<Vec<Reader>> {
    let records = sqlx::query_as::<_, ReaderRecord>(
        "SELECT id, user_id, story_id, current_page_number, created_at, updated_at \
         FROM readers WHERE story_id = $1",
    )
    .bind(story_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(records.into_iter().map(ReaderRecord::to_domain).collect())
}
