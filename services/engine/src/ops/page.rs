//! services/engine/src/ops/page.rs
//!
//! Page lifecycle. All mutations are restricted to the author of the parent
//! story.

use crate::context::RequestContext;
use crate::ops::ensure_story_author;
use crate::repo::{comments, pages, stories};
use storycove_core::{CoreError, CoreResult, NewPage, Page, PageDetail, PagePatch, Story};
use uuid::Uuid;

async fn get_page_row(ctx: &mut RequestContext, id: Uuid) -> CoreResult<Page> {
    pages::find(ctx.tx()?, id)
        .await?
        .ok_or_else(|| CoreError::NotFound("page".to_string()))
}

/// The parent story of an existing page. A missing parent is a broken
/// cascade, not a client error.
async fn parent_story(ctx: &mut RequestContext, page: &Page) -> CoreResult<Story> {
    stories::find(ctx.tx()?, page.story_id).await?.ok_or_else(|| {
        CoreError::Storage(format!("story {} missing for page {}", page.story_id, page.id))
    })
}

pub async fn create_page(
    ctx: &mut RequestContext,
    story_id: Uuid,
    input: NewPage,
) -> CoreResult<Page> {
    let user_id = ctx.user()?.id;
    let story = stories::find(ctx.tx()?, story_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("story".to_string()))?;
    ensure_story_author(&story, user_id, "add pages to it")?;
    pages::insert(ctx.tx()?, story_id, &input).await
}

pub async fn pages_of_story(ctx: &mut RequestContext, story_id: Uuid) -> CoreResult<Vec<Page>> {
    pages::list_for_story(ctx.tx()?, story_id).await
}

pub async fn get_page(ctx: &mut RequestContext, id: Uuid) -> CoreResult<PageDetail> {
    let page = get_page_row(ctx, id).await?;
    let comment_rows = comments::list_for_page(ctx.tx()?, page.id).await?;
    Ok(PageDetail {
        page,
        comments: comment_rows,
    })
}

pub async fn update_page(ctx: &mut RequestContext, id: Uuid, patch: PagePatch) -> CoreResult<Page> {
    let user_id = ctx.user()?.id;
    let mut page = get_page_row(ctx, id).await?;
    let story = parent_story(ctx, &page).await?;
    ensure_story_author(&story, user_id, "update its pages")?;

    if let Some(page_number) = patch.page_number {
        page.page_number = page_number;
    }
    if let Some(content) = patch.content {
        page.content = content;
    }
    if let Some(media_id) = patch.media_id {
        page.media_id = Some(media_id);
    }
    if let Some(meta) = patch.meta {
        page.meta = Some(meta);
    }

    pages::update(ctx.tx()?, &page).await
}

pub async fn delete_page(ctx: &mut RequestContext, id: Uuid) -> CoreResult<()> {
    let user_id = ctx.user()?.id;
    let page = get_page_row(ctx, id).await?;
    let story = parent_story(ctx, &page).await?;
    ensure_story_author(&story, user_id, "delete its pages")?;
    pages::delete(ctx.tx()?, id).await
}
