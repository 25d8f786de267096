//! services/engine/src/ops/mod.rs
//!
//! The domain operations. Every function takes the [`RequestContext`] seeded
//! by the transaction coordinator as its first argument and performs all of
//! its reads and writes on that context's transaction.
//!
//! [`RequestContext`]: crate::context::RequestContext

pub mod category;
pub mod comment;
pub mod page;
pub mod story;

use storycove_core::{CoreError, CoreResult, Story};
use uuid::Uuid;

/// Only a story's author may mutate the story or its pages.
pub(crate) fn ensure_story_author(story: &Story, user_id: Uuid, action: &str) -> CoreResult<()> {
    if story.author_id != user_id {
        return Err(CoreError::Forbidden(format!(
            "only the story author may {action}"
        )));
    }
    Ok(())
}
