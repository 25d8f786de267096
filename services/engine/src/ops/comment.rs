//! services/engine/src/ops/comment.rs

use crate::context::RequestContext;
use crate::repo::{comments, pages, stories};
use storycove_core::{Comment, CommentTarget, CoreError, CoreResult, NewComment};
use uuid::Uuid;

pub async fn comment_on_story(
    ctx: &mut RequestContext,
    story_id: Uuid,
    input: NewComment,
) -> CoreResult<Comment> {
    let author_id = ctx.user()?.id;
    stories::find(ctx.tx()?, story_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("story".to_string()))?;
    comments::insert(
        ctx.tx()?,
        author_id,
        CommentTarget::Story(story_id),
        &input.content,
    )
    .await
}

pub async fn comment_on_page(
    ctx: &mut RequestContext,
    page_id: Uuid,
    input: NewComment,
) -> CoreResult<Comment> {
    let author_id = ctx.user()?.id;
    pages::find(ctx.tx()?, page_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("page".to_string()))?;
    comments::insert(
        ctx.tx()?,
        author_id,
        CommentTarget::Page(page_id),
        &input.content,
    )
    .await
}

/// Only a comment's own author may delete it.
pub async fn delete_comment(ctx: &mut RequestContext, id: Uuid) -> CoreResult<()> {
    let user_id = ctx.user()?.id;
    let comment = comments::find(ctx.tx()?, id)
        .await?
        .ok_or_else(|| CoreError::NotFound("comment".to_string()))?;
    if comment.author_id != user_id {
        return Err(CoreError::Forbidden(
            "only the comment author may delete it".to_string(),
        ));
    }
    comments::delete(ctx.tx()?, id).await
}
