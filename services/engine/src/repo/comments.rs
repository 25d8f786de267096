//! services/engine/src/repo/comments.rs

use crate::repo::storage_err;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use storycove_core::{Comment, CommentTarget, CoreError, CoreResult};
use uuid::Uuid;

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    content: String,
    user_id: Uuid,
    story_id: Option<Uuid>,
    page_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl CommentRecord {
    fn to_domain(self) -> CoreResult<Comment> {
        // The schema's CHECK guarantees exactly one of the two is set.
        let target = match (self.story_id, self.page_id) {
            (Some(story_id), None) => CommentTarget::Story(story_id),
            (None, Some(page_id)) => CommentTarget::Page(page_id),
            _ => {
                return Err(CoreError::Storage(format!(
                    "comment {} has an inconsistent target",
                    self.id
                )))
            }
        };
        Ok(Comment {
            id: self.id,
            content: self.content,
            author_id: self.user_id,
            target,
            created_at: self.created_at,
        })
    }
}

pub async fn insert(
    conn: &mut PgConnection,
    author_id: Uuid,
    target: CommentTarget,
    content: &str,
) -> CoreResult<Comment> {
    let (story_id, page_id) = match target {
        CommentTarget::Story(id) => (Some(id), None),
        CommentTarget::Page(id) => (None, Some(id)),
    };
    let record = sqlx::query_as::<_, CommentRecord>(
        "INSERT INTO comments (id, content, user_id, story_id, page_id) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, content, user_id, story_id, page_id, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(content)
    .bind(author_id)
    .bind(story_id)
    .bind(page_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    record.to_domain()
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> CoreResult<Option<Comment>> {
    let record = sqlx::query_as::<_, CommentRecord>(
        "SELECT id, content, user_id, story_id, page_id, created_at \
         FROM comments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;
    record.map(CommentRecord::to_domain).transpose()
}

/// Comments attached to the story itself; page comments are loaded through
/// [`list_for_page`].
pub async fn list_for_story(conn: &mut PgConnection, story_id: Uuid) -> CoreResult<Vec<Comment>> {
    let records = sqlx::query_as::<_, CommentRecord>(
        "SELECT id, content, user_id, story_id, page_id, created_at \
         FROM comments WHERE story_id = $1 ORDER BY created_at ASC",
    )
    .bind(story_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    records.into_iter().map(CommentRecord::to_domain).collect()
}

pub async fn list_for_page(conn: &mut PgConnection, page_id: Uuid) -> CoreResult<Vec<Comment>> {
    let records = sqlx::query_as::<_, CommentRecord>(
        "SELECT id, content, user_id, story_id, page_id, created_at \
         FROM comments WHERE page_id = $1 ORDER BY created_at ASC",
    )
    .bind(page_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    records.into_iter().map(CommentRecord::to_domain).collect()
}

pub async fn delete(conn: &mut PgConnection, id: Uuid) -> CoreResult<()> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;
    Ok(())
}
