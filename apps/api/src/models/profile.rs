use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row in `coding_profiles`, the cached statistics for one
/// (user, platform) pair. UNIQUE(clerk_id, platform) in the schema, so
/// there is at most one row per pair and concurrent refreshes for
/// different platforms never touch the same row.
///
/// Columns are nullable because each platform fills only its own subset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CodingProfileRow {
    pub id: i32,
    pub clerk_id: String,
    pub platform: String,
    pub username: String,
    pub last_updated: DateTime<Utc>,

    // GitHub
    pub total_contributions: Option<i32>,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    pub total_stars: Option<i32>,
    pub total_forks: Option<i32>,
    /// Language usage percentages, e.g. {"Python": 65.2, "Rust": 34.8}.
    pub languages: Option<serde_json::Value>,

    // LeetCode
    pub total_problems_solved: Option<i32>,
    pub easy_solved: Option<i32>,
    pub medium_solved: Option<i32>,
    pub hard_solved: Option<i32>,
    /// LeetCode extras: {"beats_stats": {...}, "ranking": N,
    /// "reputation": N, "contribution_points": N}.
    pub problem_categories: Option<serde_json::Value>,

    // CodeChef
    pub current_rating: Option<i32>,
    pub highest_rating: Option<i32>,
    pub global_rank: Option<i32>,
    pub country_rank: Option<i32>,
    pub stars: Option<i32>,

    // Codeforces
    pub codeforces_rating: Option<i32>,
    pub codeforces_max_rating: Option<i32>,
    pub problems_solved_count: Option<i32>,
}
