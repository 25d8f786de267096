//! services/engine/src/repo/pages.rs

use crate::repo::storage_err;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use storycove_core::{CoreResult, NewPage, Page};
use uuid::Uuid;

const PAGE_COLUMNS: &str = "id, story_id, page_number, content, media_id, meta, updated_at";

#[derive(FromRow)]
struct PageRecord {
    id: Uuid,
    story_id: Uuid,
    page_number: i32,
    content: String,
    media_id: Option<String>,
    meta: Option<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
}

impl PageRecord {
    fn to_domain(self) -> Page {
        Page {
            id: self.id,
            story_id: self.story_id,
            page_number: self.page_number,
            content: self.content,
            media_id: self.media_id,
            meta: self.meta,
            updated_at: self.updated_at,
        }
    }
}

pub async fn insert(conn: &mut PgConnection, story_id: Uuid, page: &NewPage) -> CoreResult<Page> {
    let record = sqlx::query_as::<_, PageRecord>(&format!(
        "INSERT INTO pages (id, story_id, page_number, content, media_id, meta) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {PAGE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(story_id)
    .bind(page.page_number)
    .bind(&page.content)
    .bind(&page.media_id)
    .bind(&page.meta)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> CoreResult<Option<Page>> {
    let record =
        sqlx::query_as::<_, PageRecord>(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(storage_err)?;
    Ok(record.map(PageRecord::to_domain))
}

/// Pages of a story in display order. Duplicate page numbers are tolerated;
/// ties keep insertion order stable enough for display.
pub async fn list_for_story(conn: &mut PgConnection, story_id: Uuid) -> CoreResult<Vec<Page>> {
    let records = sqlx::query_as::<_, PageRecord>(&format!(
        "SELECT {PAGE_COLUMNS} FROM pages WHERE story_id = $1 ORDER BY page_number ASC"
    ))
    .bind(story_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(records.into_iter().map(PageRecord::to_domain).collect())
}

pub async fn update(conn: &mut PgConnection, page: &Page) -> CoreResult<Page> {
    let record = sqlx::query_as::<_, PageRecord>(&format!(
        "UPDATE pages \
         SET page_number = $2, content = $3, media_id = $4, meta = $5, updated_at = now() \
         WHERE id = $1 \
         RETURNING {PAGE_COLUMNS}"
    ))
    .bind(page.id)
    .bind(page.page_number)
    .bind(&page.content)
    .bind(&page.media_id)
    .bind(&page.meta)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn delete(conn: &mut PgConnection, id: Uuid) -> CoreResult<()> {
    sqlx::query("DELETE FROM pages WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;
    Ok(())
}
