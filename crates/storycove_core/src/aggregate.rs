//! crates/storycove_core/src/aggregate.rs
//!
//! Pure, side-effect-free functions that derive read-mostly statistics from
//! already-loaded child rows of a story. The repositories load the rows; no
//! function here ever touches the database.

use crate::domain::{Comment, Rating, Reader, StoryOverview, StoryStats};
use std::collections::BTreeMap;

/// The bucket stories with zero category links fall into when grouping.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Arithmetic mean of all rate values, rounded to 2 decimal places.
/// Defined as 0 when no ratings exist - not an error, not a null.
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(r.rate)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Count of ratings per rate value. All five keys 1..=5 are always present,
/// defaulting to 0. Out-of-range rates cannot occur (CHECK constraint) and
/// are ignored here rather than panicking on bad data.
pub fn rating_distribution(ratings: &[Rating]) -> BTreeMap<i32, usize> {
    let mut summary: BTreeMap<i32, usize> = (1..=5).map(|rate| (rate, 0)).collect();
    for rating in ratings {
        if let Some(count) = summary.get_mut(&rating.rate) {
            *count += 1;
        }
    }
    summary
}

/// One row per distinct user who has recorded progress in the story.
pub fn reader_count(readers: &[Reader]) -> usize {
    readers.len()
}

/// Comments attached to the story directly, not via its pages.
pub fn comment_count(comments: &[Comment]) -> usize {
    comments.len()
}

/// Combines the individual aggregations into the stats block attached to
/// story read models.
pub fn story_stats(ratings: &[Rating], readers: &[Reader], comments: &[Comment]) -> StoryStats {
    StoryStats {
        ratings_count: ratings.len(),
        readers_count: reader_count(readers),
        comments_count: comment_count(comments),
        average_rating: average_rating(ratings),
        ratings_summary: rating_distribution(ratings),
    }
}

/// Partitions stories into buckets keyed by category name.
///
/// A story tagged with N categories appears in all N buckets (fan-out, not
/// an exclusive partition); a story with zero categories goes into the
/// reserved [`UNCATEGORIZED`] bucket only.
pub fn group_by_category(stories: &[StoryOverview]) -> BTreeMap<String, Vec<StoryOverview>> {
    let mut grouped: BTreeMap<String, Vec<StoryOverview>> = BTreeMap::new();
    for story in stories {
        if story.categories.is_empty() {
            grouped
                .entry(UNCATEGORIZED.to_string())
                .or_default()
                .push(story.clone());
            continue;
        }
        for category in &story.categories {
            grouped
                .entry(category.name.clone())
                .or_default()
                .push(story.clone());
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Story, StoryStatus, User};
    use chrono::Utc;
    use uuid::Uuid;

    fn rating(rate: i32) -> Rating {
        Rating {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            rate,
            created_at: Utc::now(),
        }
    }

    fn ratings(rates: &[i32]) -> Vec<Rating> {
        rates.iter().copied().map(rating).collect()
    }

    fn overview(categories: &[&str]) -> StoryOverview {
        let now = Utc::now();
        StoryOverview {
            story: Story {
                id: Uuid::new_v4(),
                title: "t".into(),
                description: None,
                cover_photo: None,
                status: StoryStatus::Published,
                publishing_date: now,
                updated_at: None,
                author_id: Uuid::new_v4(),
            },
            author: User {
                id: Uuid::new_v4(),
                username: "u".into(),
                email: "u@example.com".into(),
                profile_picture: None,
            },
            categories: categories
                .iter()
                .map(|name| Category {
                    id: Uuid::new_v4(),
                    name: (*name).into(),
                    description: None,
                    color: "#000000".into(),
                    created_at: now,
                })
                .collect(),
            stats: story_stats(&[], &[], &[]),
        }
    }

    #[test]
    fn average_of_known_ratings() {
        let rows = ratings(&[5, 5, 4, 3, 1]);
        assert_eq!(average_rating(&rows), 3.6);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        // 1+2+5 = 8 over 3 = 2.666... -> 2.67
        let rows = ratings(&[1, 2, 5]);
        assert_eq!(average_rating(&rows), 2.67);
    }

    #[test]
    fn average_of_no_ratings_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn distribution_has_all_five_keys() {
        let rows = ratings(&[5, 5, 4, 3, 1]);
        let dist = rating_distribution(&rows);
        assert_eq!(dist.len(), 5);
        assert_eq!(dist[&1], 1);
        assert_eq!(dist[&2], 0);
        assert_eq!(dist[&3], 1);
        assert_eq!(dist[&4], 1);
        assert_eq!(dist[&5], 2);
    }

    #[test]
    fn empty_distribution_is_all_zeros() {
        let dist = rating_distribution(&[]);
        assert_eq!(dist.len(), 5);
        assert!(dist.values().all(|count| *count == 0));
    }

    #[test]
    fn stats_combine_all_aggregates() {
        let rows = ratings(&[4, 2]);
        let stats = story_stats(&rows, &[], &[]);
        assert_eq!(stats.ratings_count, 2);
        assert_eq!(stats.readers_count, 0);
        assert_eq!(stats.comments_count, 0);
        assert_eq!(stats.average_rating, 3.0);
        assert_eq!(stats.ratings_summary[&2], 1);
        assert_eq!(stats.ratings_summary[&4], 1);
    }

    #[test]
    fn grouping_fans_out_across_categories() {
        let tagged = overview(&["Fantasy", "Adventure"]);
        let untagged = overview(&[]);
        let grouped = group_by_category(&[tagged.clone(), untagged.clone()]);

        assert_eq!(grouped["Fantasy"].len(), 1);
        assert_eq!(grouped["Adventure"].len(), 1);
        assert_eq!(grouped[UNCATEGORIZED].len(), 1);
        assert_eq!(grouped["Fantasy"][0].story.id, tagged.story.id);
        assert_eq!(grouped[UNCATEGORIZED][0].story.id, untagged.story.id);
        // The tagged story appears in both of its buckets and nowhere else.
        assert!(!grouped[UNCATEGORIZED]
            .iter()
            .any(|s| s.story.id == tagged.story.id));
    }
}
