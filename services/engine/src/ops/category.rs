//! services/engine/src/ops/category.rs

use crate::context::RequestContext;
use crate::repo::categories;
use storycove_core::{Category, CategoryPatch, CoreError, CoreResult, NewCategory};
use uuid::Uuid;

async fn get_category_row(ctx: &mut RequestContext, id: Uuid) -> CoreResult<Category> {
    categories::find(ctx.tx()?, id)
        .await?
        .ok_or_else(|| CoreError::NotFound("category".to_string()))
}

pub async fn create_category(
    ctx: &mut RequestContext,
    input: NewCategory,
) -> CoreResult<Category> {
    ctx.user()?;
    categories::insert(
        ctx.tx()?,
        &input.name,
        input.description.as_deref(),
        input.color.as_deref(),
    )
    .await
}

pub async fn list_categories(ctx: &mut RequestContext) -> CoreResult<Vec<Category>> {
    categories::list(ctx.tx()?).await
}

pub async fn get_category(ctx: &mut RequestContext, id: Uuid) -> CoreResult<Category> {
    get_category_row(ctx, id).await
}

pub async fn update_category(
    ctx: &mut RequestContext,
    id: Uuid,
    patch: CategoryPatch,
) -> CoreResult<Category> {
    ctx.user()?;
    let mut category = get_category_row(ctx, id).await?;

    if let Some(name) = patch.name {
        category.name = name;
    }
    if let Some(description) = patch.description {
        category.description = Some(description);
    }
    if let Some(color) = patch.color {
        category.color = color;
    }

    categories::update(ctx.tx()?, &category).await
}

pub async fn delete_category(ctx: &mut RequestContext, id: Uuid) -> CoreResult<()> {
    ctx.user()?;
    get_category_row(ctx, id).await?;
    categories::delete(ctx.tx()?, id).await
}
