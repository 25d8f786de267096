//! Integration tests for the transactional engine.
//!
//! These run against a real Postgres pointed at by `DATABASE_URL` and are
//! ignored by default; provision a throwaway database and run
//! `cargo test -- --ignored` to execute them. Each test creates its own
//! uniquely-named users/stories so the suite can run repeatedly against the
//! same database.

use engine_lib::{ops, repo, seed, within_transaction, Caller, Engine};
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use std::sync::Arc;
use storycove_core::{
    CoreError, CoreResult, NewCategory, NewComment, NewPage, NewStory, NoopFinalizer, Story,
    StoryPatch, UploadFinalizer, User,
};
use uuid::Uuid;

/// Finalizer whose rename always fails, standing in for unreachable file
/// storage.
struct FailingFinalizer;

#[async_trait::async_trait]
impl UploadFinalizer for FailingFinalizer {
    async fn finalize(&self, _staged: &str, _final_name: &str) -> CoreResult<String> {
        Err(CoreError::Storage("rename refused".to_string()))
    }
}

const REQUIRES_PG: &str = "requires a running Postgres (set DATABASE_URL)";

async fn engine() -> Engine {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("test database unreachable");
    let engine = Engine::new(pool, Arc::new(NoopFinalizer));
    engine.run_migrations().await.expect("migrations failed");
    engine
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

async fn new_user(engine: &Engine, prefix: &str) -> User {
    seed::create_user(engine.pool(), &unique(prefix))
        .await
        .expect("seeding user failed")
}

async fn new_story(engine: &Engine, author: &User, title: &str) -> Story {
    engine
        .create_story(
            Caller::User(author.clone()),
            NewStory {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("creating story failed")
}

async fn rating_rows(engine: &Engine, story_id: Uuid) -> Vec<(Uuid, i32)> {
    sqlx::query("SELECT user_id, rate FROM ratings WHERE story_id = $1")
        .bind(story_id)
        .fetch_all(engine.pool())
        .await
        .expect("query failed")
        .into_iter()
        .map(|row| (row.get("user_id"), row.get("rate")))
        .collect()
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn rollback_discards_partial_writes() {
    let engine = engine().await;
    let author = new_user(&engine, "atomic-author").await;
    let title = unique("atomic-story");

    let result: CoreResult<Story> = within_transaction(
        engine.pool(),
        Caller::User(author.clone()),
        "test_injected_failure",
        {
            let title = title.clone();
            move |ctx| {
                Box::pin(async move {
                    // First write succeeds inside the transaction...
                    ops::story::create_story(
                        ctx,
                        NewStory {
                            title,
                            ..Default::default()
                        },
                    )
                    .await?;
                    // ...then the operation fails before its second write.
                    Err(CoreError::Storage("injected failure".to_string()))
                })
            }
        },
    )
    .await;
    assert!(matches!(result, Err(CoreError::Storage(_))));

    // The first write must not have persisted.
    let listed = engine
        .list_stories(Caller::Anonymous, Some(title), None)
        .await
        .expect("listing failed");
    assert!(listed.is_empty());
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn rating_upsert_is_idempotent_and_overwrites() {
    let engine = engine().await;
    let author = new_user(&engine, "rate-author").await;
    let reader = new_user(&engine, "rate-reader").await;
    let story = new_story(&engine, &author, &unique("rated-story")).await;

    let first = engine
        .rate_story(Caller::User(reader.clone()), story.id, 4)
        .await
        .expect("first rating failed");
    let second = engine
        .rate_story(Caller::User(reader.clone()), story.id, 4)
        .await
        .expect("same-value re-rating failed");
    assert_eq!(first.id, second.id);

    let third = engine
        .rate_story(Caller::User(reader.clone()), story.id, 5)
        .await
        .expect("overwriting rating failed");
    assert_eq!(first.id, third.id);
    assert_eq!(third.rate, 5);

    let rows = rating_rows(&engine, story.id).await;
    assert_eq!(rows, vec![(reader.id, 5)]);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn racing_first_ratings_leave_one_row_and_one_conflict() {
    let engine = engine().await;
    let author = new_user(&engine, "race-author").await;
    let reader = new_user(&engine, "race-reader").await;
    let story = new_story(&engine, &author, &unique("raced-story")).await;

    // Deterministic interleaving of the race: both transactions pass the
    // not-yet-rated lookup before either writes.
    let mut tx1 = engine.pool().begin().await.expect(REQUIRES_PG);
    let mut tx2 = engine.pool().begin().await.expect(REQUIRES_PG);
    assert!(repo::ratings::find_for(&mut tx1, reader.id, story.id)
        .await
        .expect("lookup failed")
        .is_none());
    assert!(repo::ratings::find_for(&mut tx2, reader.id, story.id)
        .await
        .expect("lookup failed")
        .is_none());

    repo::ratings::insert(&mut tx1, reader.id, story.id, 5)
        .await
        .expect("winner insert failed");
    tx1.commit().await.expect("winner commit failed");

    let err = repo::ratings::insert(&mut tx2, reader.id, story.id, 3)
        .await
        .expect_err("loser insert must be rejected");
    assert!(matches!(err, CoreError::Conflict(_)));
    tx2.rollback().await.expect("loser rollback failed");

    let rows = rating_rows(&engine, story.id).await;
    assert_eq!(rows, vec![(reader.id, 5)]);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn only_the_author_may_mutate_a_story() {
    let engine = engine().await;
    let author = new_user(&engine, "owner").await;
    let intruder = new_user(&engine, "intruder").await;
    let story = new_story(&engine, &author, &unique("owned-story")).await;

    let err = engine
        .delete_story(Caller::User(intruder.clone()), story.id)
        .await
        .expect_err("foreign delete must be rejected");
    assert!(matches!(err, CoreError::Forbidden(_)));

    let err = engine
        .update_story(
            Caller::User(intruder.clone()),
            story.id,
            StoryPatch {
                title: Some("hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("foreign update must be rejected");
    assert!(matches!(err, CoreError::Forbidden(_)));

    // The story is still there, untouched.
    let detail = engine
        .get_story(Caller::Anonymous, story.id)
        .await
        .expect("story must survive");
    assert_eq!(detail.overview.story.title, story.title);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn pages_are_restricted_to_the_story_author() {
    let engine = engine().await;
    let author = new_user(&engine, "page-owner").await;
    let intruder = new_user(&engine, "page-intruder").await;
    let story = new_story(&engine, &author, &unique("paged-story")).await;

    let err = engine
        .create_page(
            Caller::User(intruder.clone()),
            story.id,
            NewPage {
                page_number: 1,
                content: "not mine".to_string(),
                media_id: None,
                meta: None,
            },
        )
        .await
        .expect_err("foreign page insert must be rejected");
    assert!(matches!(err, CoreError::Forbidden(_)));

    let page = engine
        .create_page(
            Caller::User(author.clone()),
            story.id,
            NewPage {
                page_number: 1,
                content: "once upon a time".to_string(),
                media_id: None,
                meta: Some(serde_json::json!({"illustrated": true})),
            },
        )
        .await
        .expect("author page insert failed");

    let err = engine
        .delete_page(Caller::User(intruder), page.id)
        .await
        .expect_err("foreign page delete must be rejected");
    assert!(matches!(err, CoreError::Forbidden(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn reading_progress_upserts_per_user_and_story() {
    let engine = engine().await;
    let author = new_user(&engine, "progress-author").await;
    let reader = new_user(&engine, "progress-reader").await;
    let story = new_story(&engine, &author, &unique("progress-story")).await;

    let first = engine
        .set_reading_progress(Caller::User(reader.clone()), story.id, 3)
        .await
        .expect("first progress write failed");
    let second = engine
        .set_reading_progress(Caller::User(reader.clone()), story.id, 7)
        .await
        .expect("progress overwrite failed");
    assert_eq!(first.id, second.id);
    assert_eq!(second.current_page_number, 7);

    let stats = engine
        .story_stats(Caller::Anonymous, story.id)
        .await
        .expect("stats failed");
    assert_eq!(stats.readers_count, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn stats_reflect_ratings_and_comments() {
    let engine = engine().await;
    let author = new_user(&engine, "stats-author").await;
    let story = new_story(&engine, &author, &unique("stats-story")).await;

    for rate in [5, 5, 4, 3, 1] {
        let voter = new_user(&engine, "stats-voter").await;
        engine
            .rate_story(Caller::User(voter), story.id, rate)
            .await
            .expect("rating failed");
    }
    engine
        .comment_on_story(
            Caller::User(author.clone()),
            story.id,
            NewComment {
                content: "author's note".to_string(),
            },
        )
        .await
        .expect("comment failed");

    let stats = engine
        .story_stats(Caller::Anonymous, story.id)
        .await
        .expect("stats failed");
    assert_eq!(stats.ratings_count, 5);
    assert_eq!(stats.average_rating, 3.6);
    assert_eq!(stats.ratings_summary[&5], 2);
    assert_eq!(stats.ratings_summary[&2], 0);
    assert_eq!(stats.comments_count, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn grouped_listing_fans_out_across_categories() {
    let engine = engine().await;
    let author = new_user(&engine, "group-author").await;
    let run = Uuid::new_v4().to_string();

    let fantasy = engine
        .create_category(
            Caller::User(author.clone()),
            NewCategory {
                name: unique("Fantasy"),
                description: None,
                color: None,
            },
        )
        .await
        .expect("category failed");
    let adventure = engine
        .create_category(
            Caller::User(author.clone()),
            NewCategory {
                name: unique("Adventure"),
                description: None,
                color: Some("#ff8800".to_string()),
            },
        )
        .await
        .expect("category failed");

    let tagged = engine
        .create_story(
            Caller::User(author.clone()),
            NewStory {
                title: format!("{run} tagged"),
                category_ids: vec![fantasy.id, adventure.id],
                ..Default::default()
            },
        )
        .await
        .expect("tagged story failed");
    let untagged = engine
        .create_story(
            Caller::User(author.clone()),
            NewStory {
                title: format!("{run} untagged"),
                ..Default::default()
            },
        )
        .await
        .expect("untagged story failed");

    let grouped = engine
        .list_stories_grouped(Caller::Anonymous, Some(run))
        .await
        .expect("grouped listing failed");

    let in_bucket = |name: &str, id: Uuid| {
        grouped
            .get(name)
            .map(|bucket| bucket.iter().any(|s| s.story.id == id))
            .unwrap_or(false)
    };
    assert!(in_bucket(&fantasy.name, tagged.id));
    assert!(in_bucket(&adventure.name, tagged.id));
    assert!(in_bucket("Uncategorized", untagged.id));
    assert!(!in_bucket("Uncategorized", tagged.id));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn comments_may_only_be_deleted_by_their_author() {
    let engine = engine().await;
    let author = new_user(&engine, "comment-author").await;
    let commenter = new_user(&engine, "commenter").await;
    let story = new_story(&engine, &author, &unique("commented-story")).await;

    let comment = engine
        .comment_on_story(
            Caller::User(commenter.clone()),
            story.id,
            NewComment {
                content: "loved it".to_string(),
            },
        )
        .await
        .expect("comment failed");

    let err = engine
        .delete_comment(Caller::User(author.clone()), comment.id)
        .await
        .expect_err("foreign comment delete must be rejected");
    assert!(matches!(err, CoreError::Forbidden(_)));

    engine
        .delete_comment(Caller::User(commenter), comment.id)
        .await
        .expect("own comment delete failed");
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn deleting_a_story_cascades_to_its_children() {
    let engine = engine().await;
    let author = new_user(&engine, "cascade-author").await;
    let reader = new_user(&engine, "cascade-reader").await;
    let story = new_story(&engine, &author, &unique("cascaded-story")).await;

    let page = engine
        .create_page(
            Caller::User(author.clone()),
            story.id,
            NewPage {
                page_number: 1,
                content: "to be removed".to_string(),
                media_id: None,
                meta: None,
            },
        )
        .await
        .expect("page failed");
    engine
        .comment_on_page(
            Caller::User(reader.clone()),
            page.id,
            NewComment {
                content: "gone soon".to_string(),
            },
        )
        .await
        .expect("comment failed");
    engine
        .rate_story(Caller::User(reader.clone()), story.id, 5)
        .await
        .expect("rating failed");

    engine
        .delete_story(Caller::User(author), story.id)
        .await
        .expect("delete failed");

    let err = engine
        .get_page(Caller::Anonymous, page.id)
        .await
        .expect_err("page must cascade away");
    assert!(matches!(err, CoreError::NotFound(_)));
    assert!(rating_rows(&engine, story.id).await.is_empty());
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn duplicate_category_names_conflict() {
    let engine = engine().await;
    let user = new_user(&engine, "cat-author").await;
    let name = unique("Unique-Category");

    engine
        .create_category(
            Caller::User(user.clone()),
            NewCategory {
                name: name.clone(),
                description: None,
                color: None,
            },
        )
        .await
        .expect("first category failed");
    let err = engine
        .create_category(
            Caller::User(user),
            NewCategory {
                name,
                description: None,
                color: None,
            },
        )
        .await
        .expect_err("duplicate name must be rejected");
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn failed_cover_rename_does_not_undo_the_commit() {
    let engine = engine().await;
    let failing = Engine::new(engine.pool().clone(), Arc::new(FailingFinalizer));
    let author = new_user(&engine, "cover-author").await;
    let title = unique("covered-story");

    let err = failing
        .create_story(
            Caller::User(author.clone()),
            NewStory {
                title: title.clone(),
                cover_upload: Some("staged-cover.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("failing rename must surface");
    assert!(matches!(err, CoreError::Storage(_)));

    // The rename runs after commit, so the story row survives it, already
    // carrying the final id-derived cover name.
    let listed = engine
        .list_stories(Caller::Anonymous, Some(title), None)
        .await
        .expect("listing failed");
    assert_eq!(listed.len(), 1);
    let story = &listed[0].story;
    assert_eq!(
        story.cover_photo.as_deref(),
        Some(format!("{}.cover_photo.staged-cover.png", story.id).as_str())
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn story_detail_comment_rows_match_the_stats_count() {
    let engine = engine().await;
    let author = new_user(&engine, "detail-author").await;
    let reader = new_user(&engine, "detail-reader").await;
    let story = new_story(&engine, &author, &unique("detailed-story")).await;

    for content in ["first!", "seconded"] {
        engine
            .comment_on_story(
                Caller::User(reader.clone()),
                story.id,
                NewComment {
                    content: content.to_string(),
                },
            )
            .await
            .expect("comment failed");
    }

    let detail = engine
        .get_story(Caller::Anonymous, story.id)
        .await
        .expect("detail failed");
    assert_eq!(detail.comments.len(), 2);
    assert_eq!(detail.overview.stats.comments_count, 2);
}

#[tokio::test]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn anonymous_callers_cannot_mutate() {
    let engine = engine().await;
    let err = engine
        .create_story(
            Caller::Anonymous,
            NewStory {
                title: unique("anon-story"),
                ..Default::default()
            },
        )
        .await
        .expect_err("anonymous create must be rejected");
    assert!(matches!(err, CoreError::Forbidden(_)));
}
