use std::collections::BTreeMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::FetchError;

const GRAPHQL_URL: &str = "https://leetcode.com/graphql";

const PROFILE_QUERY: &str = r#"query getUserProfile($username: String!) {
  matchedUser(username: $username) {
    contributions { points }
    profile { reputation ranking }
    submitStatsGlobal {
      acSubmissionNum { difficulty count }
    }
    problemsSolvedBeatsStats { difficulty percentage }
  }
}"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeStats {
    pub total_solved: i32,
    pub easy_solved: i32,
    pub medium_solved: i32,
    pub hard_solved: i32,
    /// Percentile beaten per difficulty, e.g. {"easy": 95.6}.
    pub beats_stats: BTreeMap<String, f64>,
    pub ranking: i32,
    pub reputation: i32,
    pub contribution_points: i32,
}

pub(crate) async fn fetch(http: &Client, username: &str) -> Result<LeetCodeStats, FetchError> {
    let response = http
        .post(GRAPHQL_URL)
        .json(&json!({
            "query": PROFILE_QUERY,
            "variables": { "username": username },
        }))
        .send()
        .await?;

    let status = response.status();
    if status.is_server_error() {
        return Err(FetchError::Unavailable(format!(
            "LeetCode API returned {status}"
        )));
    }
    // LeetCode answers 400 for handles it cannot resolve.
    if status.as_u16() == 400 {
        return Err(FetchError::NotFound(format!(
            "LeetCode user '{username}' not found"
        )));
    }
    if !status.is_success() {
        return Err(FetchError::BadUpstreamData(format!(
            "LeetCode API returned {status}"
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| FetchError::BadUpstreamData(format!("LeetCode response not JSON: {e}")))?;

    parse_response(&body, username)
}

/// Normalizes the GraphQL response. Missing optional fields default to
/// zero/empty; a null `matchedUser` means the handle does not exist.
pub(crate) fn parse_response(body: &Value, username: &str) -> Result<LeetCodeStats, FetchError> {
    let data = body
        .get("data")
        .filter(|v| !v.is_null())
        .ok_or_else(|| FetchError::BadUpstreamData("LeetCode response missing 'data'".into()))?;

    let user = match data.get("matchedUser") {
        Some(user) if !user.is_null() => user,
        _ => {
            return Err(FetchError::NotFound(format!(
                "LeetCode user '{username}' not found"
            )))
        }
    };

    let mut solved: BTreeMap<String, i32> = BTreeMap::new();
    if let Some(entries) = user
        .pointer("/submitStatsGlobal/acSubmissionNum")
        .and_then(Value::as_array)
    {
        for entry in entries {
            if let (Some(difficulty), Some(count)) = (
                entry.get("difficulty").and_then(Value::as_str),
                entry.get("count").and_then(Value::as_i64),
            ) {
                solved.insert(difficulty.to_lowercase(), count as i32);
            }
        }
    }

    let mut beats_stats = BTreeMap::new();
    if let Some(entries) = user.get("problemsSolvedBeatsStats").and_then(Value::as_array) {
        for entry in entries {
            if let (Some(difficulty), Some(percentage)) = (
                entry.get("difficulty").and_then(Value::as_str),
                entry.get("percentage").and_then(Value::as_f64),
            ) {
                beats_stats.insert(difficulty.to_lowercase(), percentage);
            }
        }
    }

    Ok(LeetCodeStats {
        total_solved: solved.get("all").copied().unwrap_or(0),
        easy_solved: solved.get("easy").copied().unwrap_or(0),
        medium_solved: solved.get("medium").copied().unwrap_or(0),
        hard_solved: solved.get("hard").copied().unwrap_or(0),
        beats_stats,
        ranking: user.pointer("/profile/ranking").and_then(Value::as_i64).unwrap_or(0) as i32,
        reputation: user
            .pointer("/profile/reputation")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32,
        contribution_points: user
            .pointer("/contributions/points")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> Value {
        json!({
            "data": {
                "matchedUser": {
                    "contributions": { "points": 450 },
                    "profile": { "reputation": 12, "ranking": 1500 },
                    "submitStatsGlobal": {
                        "acSubmissionNum": [
                            { "difficulty": "All", "count": 320 },
                            { "difficulty": "Easy", "count": 150 },
                            { "difficulty": "Medium", "count": 130 },
                            { "difficulty": "Hard", "count": 40 }
                        ]
                    },
                    "problemsSolvedBeatsStats": [
                        { "difficulty": "Easy", "percentage": 95.6 },
                        { "difficulty": "Medium", "percentage": 82.3 },
                        { "difficulty": "Hard", "percentage": null }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_full_response() {
        let stats = parse_response(&sample_response(), "coder123").unwrap();
        assert_eq!(stats.total_solved, 320);
        assert_eq!(stats.easy_solved, 150);
        assert_eq!(stats.medium_solved, 130);
        assert_eq!(stats.hard_solved, 40);
        assert_eq!(stats.ranking, 1500);
        assert_eq!(stats.reputation, 12);
        assert_eq!(stats.contribution_points, 450);
        assert_eq!(stats.beats_stats.get("easy"), Some(&95.6));
        // Null percentages are dropped, not treated as an error.
        assert!(!stats.beats_stats.contains_key("hard"));
    }

    #[test]
    fn test_null_matched_user_is_not_found() {
        let body = json!({ "data": { "matchedUser": null } });
        let err = parse_response(&body, "ghost").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[test]
    fn test_missing_data_is_bad_upstream() {
        let body = json!({ "errors": [{ "message": "something broke" }] });
        let err = parse_response(&body, "coder123").unwrap_err();
        assert!(matches!(err, FetchError::BadUpstreamData(_)));
    }

    #[test]
    fn test_partial_payload_defaults_to_zero() {
        let body = json!({ "data": { "matchedUser": { "profile": {} } } });
        let stats = parse_response(&body, "coder123").unwrap();
        assert_eq!(stats.total_solved, 0);
        assert_eq!(stats.ranking, 0);
        assert!(stats.beats_stats.is_empty());
    }

    #[test]
    fn test_serializes_with_camel_case_fields() {
        let stats = parse_response(&sample_response(), "coder123").unwrap();
        let value = serde_json::to_value(&stats).unwrap();
        assert!(value.get("totalSolved").is_some());
        assert!(value.get("contributionPoints").is_some());
        assert!(value.get("total_solved").is_none());
    }
}
