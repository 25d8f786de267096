//! services/engine/src/engine.rs
//!
//! Top-level assembly: builds the connection pool and hands every inbound
//! operation to the transaction coordinator. This is the surface the calling
//! layer (routing, auth, upload plumbing) consumes; it passes an
//! already-authenticated [`Caller`] and already-validated payloads and gets
//! back domain results or the core error taxonomy.

use crate::config::Config;
use crate::context::Caller;
use crate::coordinator::within_transaction;
use crate::error::EngineError;
use crate::ops;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use storycove_core::{
    Category, CategoryPatch, Comment, CoreResult, NewCategory, NewComment, NewPage, NewStory,
    Page, PageDetail, PagePatch, Rating, Reader, Story, StoryDetail, StoryOverview, StoryPatch,
    StoryStats, UploadFinalizer,
};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct Engine {
    pool: PgPool,
    finalizer: Arc<dyn UploadFinalizer>,
}

impl Engine {
    pub fn new(pool: PgPool, finalizer: Arc<dyn UploadFinalizer>) -> Self {
        Self { pool, finalizer }
    }

    /// Builds the pool from configuration and wires the engine together.
    pub async fn connect(
        config: &Config,
        finalizer: Arc<dyn UploadFinalizer>,
    ) -> Result<Self, EngineError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool, finalizer))
    }

    /// Applies pending schema migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), EngineError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Renames a staged cover upload to its committed final name. Runs
    /// strictly after commit: a failure here can never undo the committed
    /// row, it only leaves a retryable rename behind.
    async fn finalize_cover(&self, staged: Option<String>, story: &Story) -> CoreResult<()> {
        if let (Some(staged), Some(final_name)) = (staged, story.cover_photo.as_deref()) {
            if let Err(err) = self.finalizer.finalize(&staged, final_name).await {
                warn!(story_id = %story.id, %err, "cover finalization failed after commit");
                return Err(err);
            }
        }
        Ok(())
    }

    // --- Story operations ---

    pub async fn create_story(&self, caller: Caller, input: NewStory) -> CoreResult<Story> {
        let staged = input.cover_upload.clone();
        let story = within_transaction(&self.pool, caller, "create_story", move |ctx| {
            Box::pin(ops::story::create_story(ctx, input))
        })
        .await?;
        self.finalize_cover(staged, &story).await?;
        Ok(story)
    }

    pub async fn list_stories(
        &self,
        caller: Caller,
        keyword: Option<String>,
        category_id: Option<Uuid>,
    ) -> CoreResult<Vec<StoryOverview>> {
        within_transaction(&self.pool, caller, "list_stories", move |ctx| {
            Box::pin(async move {
                ops::story::list_stories(ctx, keyword.as_deref(), category_id).await
            })
        })
        .await
    }

    pub async fn list_stories_grouped(
        &self,
        caller: Caller,
        keyword: Option<String>,
    ) -> CoreResult<BTreeMap<String, Vec<StoryOverview>>> {
        within_transaction(&self.pool, caller, "list_stories_grouped", move |ctx| {
            Box::pin(async move { ops::story::list_stories_grouped(ctx, keyword.as_deref()).await })
        })
        .await
    }

    pub async fn get_story(&self, caller: Caller, id: Uuid) -> CoreResult<StoryDetail> {
        within_transaction(&self.pool, caller, "get_story", move |ctx| {
            Box::pin(ops::story::get_story(ctx, id))
        })
        .await
    }

    pub async fn update_story(
        &self,
        caller: Caller,
        id: Uuid,
        patch: StoryPatch,
    ) -> CoreResult<Story> {
        let staged = patch.cover_upload.clone();
        let story = within_transaction(&self.pool, caller, "update_story", move |ctx| {
            Box::pin(ops::story::update_story(ctx, id, patch))
        })
        .await?;
        self.finalize_cover(staged, &story).await?;
        Ok(story)
    }

    pub async fn delete_story(&self, caller: Caller, id: Uuid) -> CoreResult<()> {
        within_transaction(&self.pool, caller, "delete_story", move |ctx| {
            Box::pin(ops::story::delete_story(ctx, id))
        })
        .await
    }

    pub async fn rate_story(&self, caller: Caller, story_id: Uuid, rate: i32) -> CoreResult<Rating> {
        within_transaction(&self.pool, caller, "rate_story", move |ctx| {
            Box::pin(ops::story::rate_story(ctx, story_id, rate))
        })
        .await
    }

    pub async fn set_reading_progress(
        &self,
        caller: Caller,
        story_id: Uuid,
        page_number: i32,
    ) -> CoreResult<Reader> {
        within_transaction(&self.pool, caller, "set_reading_progress", move |ctx| {
            Box::pin(ops::story::set_reading_progress(ctx, story_id, page_number))
        })
        .await
    }

    pub async fn story_stats(&self, caller: Caller, story_id: Uuid) -> CoreResult<StoryStats> {
        within_transaction(&self.pool, caller, "story_stats", move |ctx| {
            Box::pin(ops::story::story_stats(ctx, story_id))
        })
        .await
    }

    // --- Page operations ---

    pub async fn create_page(
        &self,
        caller: Caller,
        story_id: Uuid,
        input: NewPage,
    ) -> CoreResult<Page> {
        within_transaction(&self.pool, caller, "create_page", move |ctx| {
            Box::pin(ops::page::create_page(ctx, story_id, input))
        })
        .await
    }

    pub async fn pages_of_story(&self, caller: Caller, story_id: Uuid) -> CoreResult<Vec<Page>> {
        within_transaction(&self.pool, caller, "pages_of_story", move |ctx| {
            Box::pin(ops::page::pages_of_story(ctx, story_id))
        })
        .await
    }

    pub async fn get_page(&self, caller: Caller, id: Uuid) -> CoreResult<PageDetail> {
        within_transaction(&self.pool, caller, "get_page", move |ctx| {
            Box::pin(ops::page::get_page(ctx, id))
        })
        .await
    }

    pub async fn update_page(
        &self,
        caller: Caller,
        id: Uuid,
        patch: PagePatch,
    ) -> CoreResult<Page> {
        within_transaction(&self.pool, caller, "update_page", move |ctx| {
            Box::pin(ops::page::update_page(ctx, id, patch))
        })
        .await
    }

    pub async fn delete_page(&self, caller: Caller, id: Uuid) -> CoreResult<()> {
        within_transaction(&self.pool, caller, "delete_page", move |ctx| {
            Box::pin(ops::page::delete_page(ctx, id))
        })
        .await
    }

    // --- Comment operations ---

    pub async fn comment_on_story(
        &self,
        caller: Caller,
        story_id: Uuid,
        input: NewComment,
    ) -> CoreResult<Comment> {
        within_transaction(&self.pool, caller, "comment_on_story", move |ctx| {
            Box::pin(ops::comment::comment_on_story(ctx, story_id, input))
        })
        .await
    }

    pub async fn comment_on_page(
        &self,
        caller: Caller,
        page_id: Uuid,
        input: NewComment,
    ) -> CoreResult<Comment> {
        within_transaction(&self.pool, caller, "comment_on_page", move |ctx| {
            Box::pin(ops::comment::comment_on_page(ctx, page_id, input))
        })
        .await
    }

    pub async fn delete_comment(&self, caller: Caller, id: Uuid) -> CoreResult<()> {
        within_transaction(&self.pool, caller, "delete_comment", move |ctx| {
            Box::pin(ops::comment::delete_comment(ctx, id))
        })
        .await
    }

    // --- Category operations ---

    pub async fn create_category(
        &self,
        caller: Caller,
        input: NewCategory,
    ) -> CoreResult<Category> {
        within_transaction(&self.pool, caller, "create_category", move |ctx| {
            Box::pin(ops::category::create_category(ctx, input))
        })
        .await
    }

    pub async fn list_categories(&self, caller: Caller) -> CoreResult<Vec<Category>> {
        within_transaction(&self.pool, caller, "list_categories", move |ctx| {
            Box::pin(ops::category::list_categories(ctx))
        })
        .await
    }

    pub async fn get_category(&self, caller: Caller, id: Uuid) -> CoreResult<Category> {
        within_transaction(&self.pool, caller, "get_category", move |ctx| {
            Box::pin(ops::category::get_category(ctx, id))
        })
        .await
    }

    pub async fn update_category(
        &self,
        caller: Caller,
        id: Uuid,
        patch: CategoryPatch,
    ) -> CoreResult<Category> {
        within_transaction(&self.pool, caller, "update_category", move |ctx| {
            Box::pin(ops::category::update_category(ctx, id, patch))
        })
        .await
    }

    pub async fn delete_category(&self, caller: Caller, id: Uuid) -> CoreResult<()> {
        within_transaction(&self.pool, caller, "delete_category", move |ctx| {
            Box::pin(ops::category::delete_category(ctx, id))
        })
        .await
    }
}
