//! services/engine/src/repo/stories.rs

use crate::repo::storage_err;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use std::str::FromStr;
use storycove_core::{CoreError, CoreResult, Story, StoryStatus};
use uuid::Uuid;

const STORY_COLUMNS: &str =
    "id, title, description, cover_photo, status, publishing_date, updated_at, author_id";

#[derive(FromRow)]
struct StoryRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    cover_photo: Option<String>,
    status: String,
    publishing_date: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    author_id: Uuid,
}

impl StoryRecord {
    fn to_domain(self) -> CoreResult<Story> {
        let status = StoryStatus::from_str(&self.status).map_err(CoreError::Storage)?;
        Ok(Story {
            id: self.id,
            title: self.title,
            description: self.description,
            cover_photo: self.cover_photo,
            status,
            publishing_date: self.publishing_date,
            updated_at: self.updated_at,
            author_id: self.author_id,
        })
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    author_id: Uuid,
    title: &str,
    description: Option<&str>,
    status: StoryStatus,
) -> CoreResult<Story> {
    let record = sqlx::query_as::<_, StoryRecord>(&format!(
        "INSERT INTO stories (id, title, description, status, author_id) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {STORY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(description)
    .bind(status.as_str())
    .bind(author_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    record.to_domain()
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> CoreResult<Option<Story>> {
    let record = sqlx::query_as::<_, StoryRecord>(&format!(
        "SELECT {STORY_COLUMNS} FROM stories WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;
    record.map(StoryRecord::to_domain).transpose()
}

/// Persists the mutable columns of an already-loaded story and stamps
/// `updated_at`.
pub async fn update(conn: &mut PgConnection, story: &Story) -> CoreResult<Story> {
    let record = sqlx::query_as::<_, StoryRecord>(&format!(
        "UPDATE stories \
         SET title = $2, description = $3, cover_photo = $4, status = $5, updated_at = now() \
         WHERE id = $1 \
         RETURNING {STORY_COLUMNS}"
    ))
    .bind(story.id)
    .bind(&story.title)
    .bind(&story.description)
    .bind(&story.cover_photo)
    .bind(story.status.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    record.to_domain()
}

/// Deletes the story; pages, comments, ratings, readers, and category links
/// go with it via the cascading foreign keys.
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> CoreResult<()> {
    sqlx::query("DELETE FROM stories WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;
    Ok(())
}

/// Lists stories newest-first, optionally filtered by a title keyword and/or
/// a linked category.
pub async fn list(
    conn: &mut PgConnection,
    keyword: Option<&str>,
    category_id: Option<Uuid>,
) -> CoreResult<Vec<Story>> {
    let records = sqlx::query_as::<_, StoryRecord>(&format!(
        "SELECT {STORY_COLUMNS} FROM stories \
         WHERE ($1::text IS NULL OR title ILIKE '%' || $1 || '%') \
           AND ($2::uuid IS NULL OR EXISTS (\
                SELECT 1 FROM story_category \
                WHERE story_id = stories.id AND category_id = $2)) \
         ORDER BY publishing_date DESC"
    ))
    .bind(keyword)
    .bind(category_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    records
        .into_iter()
        .map(StoryRecord::to_domain)
        .collect()
}

/// Replaces the story's category link set in place.
pub async fn replace_categories(
    conn: &mut PgConnection,
    story_id: Uuid,
    category_ids: &[Uuid],
) -> CoreResult<()> {
    sqlx::query("DELETE FROM story_category WHERE story_id = $1")
        .bind(story_id)
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;
    for category_id in category_ids {
        sqlx::query("INSERT INTO story_category (story_id, category_id) VALUES ($1, $2)")
            .bind(story_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .map_err(storage_err)?;
    }
    Ok(())
}
