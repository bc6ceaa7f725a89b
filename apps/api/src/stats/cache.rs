//! Cache Store accessor: reads and typed upserts against `coding_profiles`.
//!
//! Rows are keyed per (clerk_id, platform), so refreshes for different
//! platforms never race on the same row. Same-key races are resolved by the
//! atomic `ON CONFLICT` upsert: last writer wins, and each platform's
//! statement touches only its own columns.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::models::profile::CodingProfileRow;
use crate::platforms::{
    CodeChefStats, CodeforcesStats, GitHubStats, LeetCodeStats, Platform, PlatformStats,
};

pub async fn get(
    pool: &PgPool,
    clerk_id: &str,
    platform: Platform,
) -> Result<Option<CodingProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, CodingProfileRow>(
        "SELECT * FROM coding_profiles WHERE clerk_id = $1 AND platform = $2",
    )
    .bind(clerk_id)
    .bind(platform.as_str())
    .fetch_optional(pool)
    .await
}

/// One typed upsert per platform variant. `last_updated` is stamped with
/// `now()` inside the statement; callers never write the timestamp.
pub async fn upsert(
    pool: &PgPool,
    clerk_id: &str,
    username: &str,
    stats: &PlatformStats,
) -> Result<(), sqlx::Error> {
    let platform = stats.platform();
    let query = sqlx::query(upsert_sql(platform))
        .bind(clerk_id)
        .bind(platform.as_str())
        .bind(username);

    let query = match stats {
        PlatformStats::LeetCode(s) => query
            .bind(s.total_solved)
            .bind(s.easy_solved)
            .bind(s.medium_solved)
            .bind(s.hard_solved)
            .bind(json!({
                "beats_stats": s.beats_stats,
                "ranking": s.ranking,
                "reputation": s.reputation,
                "contribution_points": s.contribution_points,
            })),
        PlatformStats::GitHub(s) => query
            .bind(s.total_contributions)
            .bind(s.current_streak)
            .bind(s.longest_streak)
            .bind(s.total_stars)
            .bind(s.total_forks)
            .bind(serde_json::to_value(&s.languages).unwrap_or(Value::Null)),
        PlatformStats::CodeChef(s) => query
            .bind(s.current_rating)
            .bind(s.highest_rating)
            .bind(s.global_rank)
            .bind(s.country_rank)
            .bind(s.stars),
        PlatformStats::Codeforces(s) => query
            .bind(s.current_rating)
            .bind(s.highest_rating)
            .bind(s.solved_problems),
    };

    query.execute(pool).await?;
    Ok(())
}

fn upsert_sql(platform: Platform) -> &'static str {
    match platform {
        Platform::LeetCode => {
            r#"
            INSERT INTO coding_profiles
                (clerk_id, platform, username, total_problems_solved, easy_solved,
                 medium_solved, hard_solved, problem_categories, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (clerk_id, platform) DO UPDATE SET
                username = EXCLUDED.username,
                total_problems_solved = EXCLUDED.total_problems_solved,
                easy_solved = EXCLUDED.easy_solved,
                medium_solved = EXCLUDED.medium_solved,
                hard_solved = EXCLUDED.hard_solved,
                problem_categories = EXCLUDED.problem_categories,
                last_updated = now()
            "#
        }
        Platform::GitHub => {
            r#"
            INSERT INTO coding_profiles
                (clerk_id, platform, username, total_contributions, current_streak,
                 longest_streak, total_stars, total_forks, languages, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (clerk_id, platform) DO UPDATE SET
                username = EXCLUDED.username,
                total_contributions = EXCLUDED.total_contributions,
                current_streak = EXCLUDED.current_streak,
                longest_streak = EXCLUDED.longest_streak,
                total_stars = EXCLUDED.total_stars,
                total_forks = EXCLUDED.total_forks,
                languages = EXCLUDED.languages,
                last_updated = now()
            "#
        }
        Platform::CodeChef => {
            r#"
            INSERT INTO coding_profiles
                (clerk_id, platform, username, current_rating, highest_rating,
                 global_rank, country_rank, stars, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (clerk_id, platform) DO UPDATE SET
                username = EXCLUDED.username,
                current_rating = EXCLUDED.current_rating,
                highest_rating = EXCLUDED.highest_rating,
                global_rank = EXCLUDED.global_rank,
                country_rank = EXCLUDED.country_rank,
                stars = EXCLUDED.stars,
                last_updated = now()
            "#
        }
        Platform::Codeforces => {
            r#"
            INSERT INTO coding_profiles
                (clerk_id, platform, username, codeforces_rating, codeforces_max_rating,
                 problems_solved_count, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (clerk_id, platform) DO UPDATE SET
                username = EXCLUDED.username,
                codeforces_rating = EXCLUDED.codeforces_rating,
                codeforces_max_rating = EXCLUDED.codeforces_max_rating,
                problems_solved_count = EXCLUDED.problems_solved_count,
                last_updated = now()
            "#
        }
    }
}

/// Rebuilds the typed payload from a cached row. A decode failure means the
/// stored shape no longer matches what the platform requires and the caller
/// must refresh.
pub fn decode_cached(platform: Platform, row: &CodingProfileRow) -> Result<PlatformStats> {
    let require = |field: Option<i32>, name: &str| {
        field.ok_or_else(|| anyhow!("cached {platform} row is missing '{name}'"))
    };

    match platform {
        Platform::LeetCode => {
            let categories = row
                .problem_categories
                .as_ref()
                .ok_or_else(|| anyhow!("cached leetcode row is missing 'problem_categories'"))?;
            let beats_stats: BTreeMap<String, f64> = categories
                .get("beats_stats")
                .map(|v| serde_json::from_value(v.clone()))
                .transpose()?
                .unwrap_or_default();
            let category_int = |name: &str| {
                categories.get(name).and_then(Value::as_i64).unwrap_or(0) as i32
            };
            Ok(PlatformStats::LeetCode(LeetCodeStats {
                total_solved: require(row.total_problems_solved, "total_problems_solved")?,
                easy_solved: require(row.easy_solved, "easy_solved")?,
                medium_solved: require(row.medium_solved, "medium_solved")?,
                hard_solved: require(row.hard_solved, "hard_solved")?,
                beats_stats,
                ranking: category_int("ranking"),
                reputation: category_int("reputation"),
                contribution_points: category_int("contribution_points"),
            }))
        }
        Platform::GitHub => {
            let languages: BTreeMap<String, f64> = row
                .languages
                .as_ref()
                .map(|v| serde_json::from_value(v.clone()))
                .transpose()?
                .unwrap_or_default();
            Ok(PlatformStats::GitHub(GitHubStats {
                total_contributions: require(row.total_contributions, "total_contributions")?,
                current_streak: row.current_streak,
                longest_streak: row.longest_streak,
                total_stars: row.total_stars,
                total_forks: row.total_forks,
                languages,
            }))
        }
        Platform::CodeChef => Ok(PlatformStats::CodeChef(CodeChefStats {
            current_rating: require(row.current_rating, "current_rating")?,
            highest_rating: require(row.highest_rating, "highest_rating")?,
            global_rank: require(row.global_rank, "global_rank")?,
            country_rank: require(row.country_rank, "country_rank")?,
            stars: require(row.stars, "stars")?,
        })),
        Platform::Codeforces => Ok(PlatformStats::Codeforces(CodeforcesStats {
            current_rating: require(row.codeforces_rating, "codeforces_rating")?,
            highest_rating: require(row.codeforces_max_rating, "codeforces_max_rating")?,
            // Rank and contribution are not cached; they refresh on the next
            // live fetch.
            rank: None,
            contribution: None,
            solved_problems: require(row.problems_solved_count, "problems_solved_count")?,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn empty_row(platform: Platform) -> CodingProfileRow {
        CodingProfileRow {
            id: 1,
            clerk_id: "user_123".to_string(),
            platform: platform.as_str().to_string(),
            username: "someone".to_string(),
            last_updated: Utc::now(),
            total_contributions: None,
            current_streak: None,
            longest_streak: None,
            total_stars: None,
            total_forks: None,
            languages: None,
            total_problems_solved: None,
            easy_solved: None,
            medium_solved: None,
            hard_solved: None,
            problem_categories: None,
            current_rating: None,
            highest_rating: None,
            global_rank: None,
            country_rank: None,
            stars: None,
            codeforces_rating: None,
            codeforces_max_rating: None,
            problems_solved_count: None,
        }
    }

    #[test]
    fn test_decode_leetcode_row() {
        let mut row = empty_row(Platform::LeetCode);
        row.total_problems_solved = Some(320);
        row.easy_solved = Some(150);
        row.medium_solved = Some(130);
        row.hard_solved = Some(40);
        row.problem_categories = Some(json!({
            "beats_stats": { "easy": 95.6 },
            "ranking": 1500,
            "reputation": 12,
            "contribution_points": 450
        }));

        let PlatformStats::LeetCode(stats) = decode_cached(Platform::LeetCode, &row).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(stats.total_solved, 320);
        assert_eq!(stats.ranking, 1500);
        assert_eq!(stats.beats_stats.get("easy"), Some(&95.6));
    }

    #[test]
    fn test_decode_leetcode_row_missing_counts_fails() {
        let mut row = empty_row(Platform::LeetCode);
        row.problem_categories = Some(json!({}));
        assert!(decode_cached(Platform::LeetCode, &row).is_err());
    }

    #[test]
    fn test_decode_github_row() {
        let mut row = empty_row(Platform::GitHub);
        row.total_contributions = Some(847);
        row.total_stars = Some(150);
        row.languages = Some(json!({ "Rust": 70.0, "Python": 30.0 }));

        let PlatformStats::GitHub(stats) = decode_cached(Platform::GitHub, &row).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(stats.total_contributions, 847);
        assert_eq!(stats.languages.get("Rust"), Some(&70.0));
        // Streaks are optional in the cached shape.
        assert_eq!(stats.current_streak, None);
    }

    #[test]
    fn test_decode_github_row_without_contributions_fails() {
        let row = empty_row(Platform::GitHub);
        assert!(decode_cached(Platform::GitHub, &row).is_err());
    }

    #[test]
    fn test_decode_codechef_requires_all_fields() {
        let mut row = empty_row(Platform::CodeChef);
        row.current_rating = Some(1843);
        row.highest_rating = Some(1902);
        row.global_rank = Some(12045);
        row.country_rank = Some(1404);
        assert!(decode_cached(Platform::CodeChef, &row).is_err());

        row.stars = Some(4);
        let PlatformStats::CodeChef(stats) = decode_cached(Platform::CodeChef, &row).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(stats.stars, 4);
    }

    #[test]
    fn test_decode_codeforces_row() {
        let mut row = empty_row(Platform::Codeforces);
        row.codeforces_rating = Some(2100);
        row.codeforces_max_rating = Some(2250);
        row.problems_solved_count = Some(412);

        let PlatformStats::Codeforces(stats) =
            decode_cached(Platform::Codeforces, &row).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(stats.current_rating, 2100);
        assert_eq!(stats.rank, None);
    }

    #[test]
    fn test_decode_rejects_cross_platform_row() {
        // A leetcode-shaped row does not satisfy the github decoder.
        let mut row = empty_row(Platform::GitHub);
        row.total_problems_solved = Some(320);
        assert!(decode_cached(Platform::GitHub, &row).is_err());
    }

    #[test]
    fn test_upsert_sql_touches_only_own_columns() {
        let leetcode = upsert_sql(Platform::LeetCode);
        assert!(leetcode.contains("total_problems_solved"));
        assert!(!leetcode.contains("total_contributions"));
        assert!(!leetcode.contains("codeforces_rating"));

        let github = upsert_sql(Platform::GitHub);
        assert!(github.contains("total_contributions"));
        assert!(!github.contains("problem_categories"));
        assert!(!github.contains("current_rating"));

        let codechef = upsert_sql(Platform::CodeChef);
        assert!(codechef.contains("country_rank"));
        assert!(!codechef.contains("languages"));

        let codeforces = upsert_sql(Platform::Codeforces);
        assert!(codeforces.contains("codeforces_max_rating"));
        assert!(!codeforces.contains("stars"));
    }

    #[test]
    fn test_upsert_sql_always_stamps_timestamp() {
        for platform in Platform::ALL {
            let sql = upsert_sql(platform);
            assert!(sql.contains("last_updated = now()"));
            assert!(sql.contains("ON CONFLICT (clerk_id, platform)"));
        }
    }
}
