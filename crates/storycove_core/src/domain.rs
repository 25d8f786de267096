//! crates/storycove_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format
//! beyond what the read models need to cross the service boundary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Public identity of a user, safe to hand to callers and to attach to
/// read models. Credential material lives in [`UserCredentials`].
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

// Only used by the storage layer and seeding - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture: Option<String>,
}

/// Publication lifecycle of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    Draft,
    Published,
    Archived,
}

impl StoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Draft => "draft",
            StoryStatus::Published => "published",
            StoryStatus::Archived => "archived",
        }
    }
}

impl FromStr for StoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(StoryStatus::Draft),
            "published" => Ok(StoryStatus::Published),
            "archived" => Ok(StoryStatus::Archived),
            other => Err(format!("unknown story status '{other}'")),
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cover_photo: Option<String>,
    pub status: StoryStatus,
    pub publishing_date: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author_id: Uuid,
}

/// One page of a story. `page_number` is a display order only; duplicate
/// numbers within a story are a tolerated data-entry condition, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: Uuid,
    pub story_id: Uuid,
    pub page_number: i32,
    pub content: String,
    pub media_id: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// What a comment is attached to. Exactly one of story or page, made
/// unrepresentable as anything else at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentTarget {
    Story(Uuid),
    Page(Uuid),
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub target: CommentTarget,
    pub created_at: DateTime<Utc>,
}

/// A single user's rating of a story, 1..=5. Unique per (user, story).
#[derive(Debug, Clone, Serialize)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub story_id: Uuid,
    pub rate: i32,
    pub created_at: DateTime<Utc>,
}

/// A user's current reading position in a story. Unique per (user, story);
/// progress updates overwrite the row in place.
#[derive(Debug, Clone, Serialize)]
pub struct Reader {
    pub id: Uuid,
    pub user_id: Uuid,
    pub story_id: Uuid,
    pub current_page_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Input shapes
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct NewStory {
    pub title: String,
    pub description: Option<String>,
    /// Staged upload reference for the cover, finalized after commit.
    pub cover_upload: Option<String>,
    pub status: Option<StoryStatus>,
    pub category_ids: Vec<Uuid>,
}

/// Partial update of a story; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StoryStatus>,
    pub cover_upload: Option<String>,
    pub category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone)]
pub struct NewPage {
    pub page_number: i32,
    pub content: String,
    pub media_id: Option<String>,
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct PagePatch {
    pub page_number: Option<i32>,
    pub content: Option<String>,
    pub media_id: Option<String>,
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

//=========================================================================================
// Read models
//=========================================================================================

/// Derived, read-mostly statistics for one story. Produced by the pure
/// functions in [`crate::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryStats {
    pub ratings_count: usize,
    pub readers_count: usize,
    pub comments_count: usize,
    /// Arithmetic mean of all rates, rounded to 2 decimal places; 0 when
    /// no ratings exist.
    pub average_rating: f64,
    /// Count per rate value; all five keys 1..=5 are always present.
    pub ratings_summary: BTreeMap<i32, usize>,
}

/// A story together with its author, category links, and derived stats, as
/// returned by the list and detail read paths.
#[derive(Debug, Clone, Serialize)]
pub struct StoryOverview {
    pub story: Story,
    pub author: User,
    pub categories: Vec<Category>,
    pub stats: StoryStats,
}

/// Full detail read model for a single story.
#[derive(Debug, Clone, Serialize)]
pub struct StoryDetail {
    pub overview: StoryOverview,
    pub pages: Vec<Page>,
    /// Comments attached to the story directly, not via its pages.
    pub comments: Vec<Comment>,
}

/// A page together with its comments.
#[derive(Debug, Clone, Serialize)]
pub struct PageDetail {
    pub page: Page,
    pub comments: Vec<Comment>,
}
