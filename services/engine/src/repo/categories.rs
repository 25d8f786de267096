//! services/engine/src/repo/categories.rs

use crate::repo::storage_err;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use storycove_core::{Category, CoreResult};
use uuid::Uuid;

#[derive(FromRow)]
struct CategoryRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    color: String,
    created_at: DateTime<Utc>,
}

impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            description: self.description,
            color: self.color,
            created_at: self.created_at,
        }
    }
}

/// Inserts a category; the display color falls back to the schema default
/// when none is given. Duplicate names surface as `Conflict`.
pub async fn insert(
    conn: &mut PgConnection,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> CoreResult<Category> {
    let record = sqlx::query_as::<_, CategoryRecord>(
        "INSERT INTO categories (id, name, description, color) \
         VALUES ($1, $2, $3, COALESCE($4, '#000000')) \
         RETURNING id, name, description, color, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .bind(color)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> CoreResult<Option<Category>> {
    let record = sqlx::query_as::<_, CategoryRecord>(
        "SELECT id, name, description, color, created_at FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.map(CategoryRecord::to_domain))
}

pub async fn list(conn: &mut PgConnection) -> CoreResult<Vec<Category>> {
    let records = sqlx::query_as::<_, CategoryRecord>(
        "SELECT id, name, description, color, created_at FROM categories ORDER BY name ASC",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
}

/// Loads the subset of `ids` that exist; unknown ids are skipped, matching
/// the link-what-you-find behavior of story create/update.
pub async fn find_by_ids(conn: &mut PgConnection, ids: &[Uuid]) -> CoreResult<Vec<Category>> {
    let records = sqlx::query_as::<_, CategoryRecord>(
        "SELECT id, name, description, color, created_at FROM categories WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
}

/// Categories linked to one story via the join table.
pub async fn for_story(conn: &mut PgConnection, story_id: Uuid) -> CoreResult<Vec<Category>> {
    let records = sqlx::query_as::<_, CategoryRecord>(
        "SELECT c.id, c.name, c.description, c.color, c.created_at \
         FROM categories c \
         JOIN story_category sc ON sc.category_id = c.id \
         WHERE sc.story_id = $1 \
         ORDER BY c.name ASC",
    )
    .bind(story_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
}

pub async fn update(conn: &mut PgConnection, category: &Category) -> CoreResult<Category> {
    let record = sqlx::query_as::<_, CategoryRecord>(
        "UPDATE categories SET name = $2, description = $3, color = $4 \
         WHERE id = $1 \
         RETURNING id, name, description, color, created_at",
    )
    .bind(category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(&category.color)
    .fetch_one(&mut *conn)
    .await
    .map_err(storage_err)?;
    Ok(record.to_domain())
}

pub async fn delete(conn: &mut PgConnection, id: Uuid) -> CoreResult<()> {
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;
    Ok(())
}
