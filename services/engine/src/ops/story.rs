//! services/engine/src/ops/story.rs
//!
//! Story lifecycle, rating and reading-progress upserts, and the read paths
//! that attach derived statistics.

use crate::context::RequestContext;
use crate::ops::ensure_story_author;
use crate::repo::{categories, comments, pages, ratings, readers, stories, users};
use std::collections::BTreeMap;
use storycove_core::aggregate;
use storycove_core::{
    Comment, CoreError, CoreResult, NewStory, Rating, Reader, Story, StoryDetail, StoryOverview,
    StoryPatch, StoryStats, StoryStatus,
};
use tracing::debug;
use uuid::Uuid;

/// The id-derived name a staged cover upload is renamed to after commit.
fn cover_final_name(story_id: Uuid, staged: &str) -> String {
    format!("{story_id}.cover_photo.{staged}")
}

async fn get_story_row(ctx: &mut RequestContext, id: Uuid) -> CoreResult<Story> {
    stories::find(ctx.tx()?, id)
        .await?
        .ok_or_else(|| CoreError::NotFound("story".to_string()))
}

/// Links the subset of the requested categories that exist; unknown ids are
/// skipped rather than failing the whole create.
async fn link_categories(
    ctx: &mut RequestContext,
    story_id: Uuid,
    category_ids: &[Uuid],
) -> CoreResult<()> {
    let found = categories::find_by_ids(ctx.tx()?, category_ids).await?;
    let ids: Vec<Uuid> = found.iter().map(|c| c.id).collect();
    stories::replace_categories(ctx.tx()?, story_id, &ids).await
}

/// Creates a story, its category links, and the final cover reference in one
/// transaction. The physical cover rename happens after commit, in the
/// engine assembly.
pub async fn create_story(ctx: &mut RequestContext, input: NewStory) -> CoreResult<Story> {
    let author_id = ctx.user()?.id;
    let status = input.status.unwrap_or(StoryStatus::Draft);
    let mut story = stories::insert(
        ctx.tx()?,
        author_id,
        &input.title,
        input.description.as_deref(),
        status,
    )
    .await?;

    if !input.category_ids.is_empty() {
        link_categories(ctx, story.id, &input.category_ids).await?;
    }

    if let Some(staged) = &input.cover_upload {
        story.cover_photo = Some(cover_final_name(story.id, staged));
        story = stories::update(ctx.tx()?, &story).await?;
    }

    debug!(story_id = %story.id, "story created");
    Ok(story)
}

async fn load_overview(
    ctx: &mut RequestContext,
    story: Story,
    comment_rows: &[Comment],
) -> CoreResult<StoryOverview> {
    let author = users::find(ctx.tx()?, story.author_id).await?.ok_or_else(|| {
        CoreError::Storage(format!("author {} missing for story {}", story.author_id, story.id))
    })?;
    let category_links = categories::for_story(ctx.tx()?, story.id).await?;
    let rating_rows = ratings::list_for_story(ctx.tx()?, story.id).await?;
    let reader_rows = readers::list_for_story(ctx.tx()?, story.id).await?;
    let stats = aggregate::story_stats(&rating_rows, &reader_rows, comment_rows);
    Ok(StoryOverview {
        story,
        author,
        categories: category_links,
        stats,
    })
}

/// Lists stories newest-first with stats attached, optionally filtered by a
/// title keyword and/or category.
pub async fn list_stories(
    ctx: &mut RequestContext,
    keyword: Option<&str>,
    category_id: Option<Uuid>,
) -> CoreResult<Vec<StoryOverview>> {
    let rows = stories::list(ctx.tx()?, keyword, category_id).await?;
    let mut overviews = Vec::with_capacity(rows.len());
    for story in rows {
        let comment_rows = comments::list_for_story(ctx.tx()?, story.id).await?;
        overviews.push(load_overview(ctx, story, &comment_rows).await?);
    }
    Ok(overviews)
}

/// Buckets the listed stories by category name; multi-category stories fan
/// out into every bucket they belong to, uncategorized ones land in the
/// reserved bucket.
pub async fn list_stories_grouped(
    ctx: &mut RequestContext,
    keyword: Option<&str>,
) -> CoreResult<BTreeMap<String, Vec<StoryOverview>>> {
    let overviews = list_stories(ctx, keyword, None).await?;
    Ok(aggregate::group_by_category(&overviews))
}

pub async fn get_story(ctx: &mut RequestContext, id: Uuid) -> CoreResult<StoryDetail> {
    let story = get_story_row(ctx, id).await?;
    let page_rows = pages::list_for_story(ctx.tx()?, id).await?;
    // One load feeds both the detail's comment list and the stats count.
    let comment_rows = comments::list_for_story(ctx.tx()?, id).await?;
    let overview = load_overview(ctx, story, &comment_rows).await?;
    Ok(StoryDetail {
        overview,
        pages: page_rows,
        comments: comment_rows,
    })
}

pub async fn update_story(
    ctx: &mut RequestContext,
    id: Uuid,
    patch: StoryPatch,
) -> CoreResult<Story> {
    let user_id = ctx.user()?.id;
    let mut story = get_story_row(ctx, id).await?;
    ensure_story_author(&story, user_id, "update it")?;

    if let Some(title) = patch.title {
        story.title = title;
    }
    if let Some(description) = patch.description {
        story.description = Some(description);
    }
    if let Some(status) = patch.status {
        story.status = status;
    }
    if let Some(staged) = &patch.cover_upload {
        story.cover_photo = Some(cover_final_name(story.id, staged));
    }
    if let Some(category_ids) = &patch.category_ids {
        link_categories(ctx, story.id, category_ids).await?;
    }

    stories::update(ctx.tx()?, &story).await
}

pub async fn delete_story(ctx: &mut RequestContext, id: Uuid) -> CoreResult<()> {
    let user_id = ctx.user()?.id;
    let story = get_story_row(ctx, id).await?;
    ensure_story_author(&story, user_id, "delete it")?;
    stories::delete(ctx.tx()?, id).await
}

/// Insert-or-update of the caller's rating, keyed on (user, story).
///
/// The lookup and the write share one transaction; if two first-time ratings
/// race past the lookup anyway, the unique constraint rejects the loser and
/// that rejection surfaces as `Conflict`, never as a corrupted state.
pub async fn rate_story(ctx: &mut RequestContext, story_id: Uuid, rate: i32) -> CoreResult<Rating> {
    let user_id = ctx.user()?.id;
    get_story_row(ctx, story_id).await?;

    match ratings::find_for(ctx.tx()?, user_id, story_id).await? {
        Some(existing) => ratings::update_rate(ctx.tx()?, existing.id, rate).await,
        None => ratings::insert(ctx.tx()?, user_id, story_id, rate).await,
    }
}

/// Same upsert shape as [`rate_story`], overwriting the caller's current
/// page in the story.
pub async fn set_reading_progress(
    ctx: &mut RequestContext,
    story_id: Uuid,
    page_number: i32,
) -> CoreResult<Reader> {
    let user_id = ctx.user()?.id;
    get_story_row(ctx, story_id).await?;

    match readers::find_for(ctx.tx()?, user_id, story_id).await? {
        Some(existing) => readers::update_progress(ctx.tx()?, existing.id, page_number).await,
        None => readers::insert(ctx.tx()?, user_id, story_id, page_number).await,
    }
}

pub async fn story_stats(ctx: &mut RequestContext, story_id: Uuid) -> CoreResult<StoryStats> {
    get_story_row(ctx, story_id).await?;
    let rating_rows = ratings::list_for_story(ctx.tx()?, story_id).await?;
    let reader_rows = readers::list_for_story(ctx.tx()?, story_id).await?;
    let comment_rows = comments::list_for_story(ctx.tx()?, story_id).await?;
    Ok(aggregate::story_stats(
        &rating_rows,
        &reader_rows,
        &comment_rows,
    ))
}
