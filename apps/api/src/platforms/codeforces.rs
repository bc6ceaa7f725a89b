use std::collections::HashSet;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FetchError;

const API_BASE: &str = "https://codeforces.com/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesStats {
    pub current_rating: i32,
    pub highest_rating: i32,
    pub rank: Option<String>,
    pub contribution: Option<i32>,
    pub solved_problems: i32,
}

pub(crate) async fn fetch(http: &Client, username: &str) -> Result<CodeforcesStats, FetchError> {
    let info: Value = get_json(http, &format!("{API_BASE}/user.info?handles={username}")).await?;

    if info.get("status").and_then(Value::as_str) != Some("OK") {
        return Err(FetchError::NotFound(format!(
            "Codeforces user '{username}' not found"
        )));
    }

    let user = info
        .pointer("/result/0")
        .ok_or_else(|| FetchError::BadUpstreamData("Codeforces user.info result empty".into()))?;

    // Solved count is best-effort: a failed user.status call degrades to 0
    // rather than failing the whole fetch.
    let submissions: Value =
        get_json(http, &format!("{API_BASE}/user.status?handle={username}")).await?;
    let solved = if submissions.get("status").and_then(Value::as_str) == Some("OK") {
        count_solved(submissions.get("result").and_then(Value::as_array))
    } else {
        0
    };

    Ok(parse_user_info(user, solved))
}

async fn get_json(http: &Client, url: &str) -> Result<Value, FetchError> {
    let response = http.get(url).send().await?;
    let status = response.status();
    if status.is_server_error() {
        return Err(FetchError::Unavailable(format!(
            "Codeforces API returned {status}"
        )));
    }
    response
        .json()
        .await
        .map_err(|e| FetchError::BadUpstreamData(format!("Codeforces response not JSON: {e}")))
}

pub(crate) fn parse_user_info(user: &Value, solved_problems: i32) -> CodeforcesStats {
    CodeforcesStats {
        current_rating: user.get("rating").and_then(Value::as_i64).unwrap_or(0) as i32,
        highest_rating: user.get("maxRating").and_then(Value::as_i64).unwrap_or(0) as i32,
        rank: Some(
            user.get("rank")
                .and_then(Value::as_str)
                .unwrap_or("unrated")
                .to_string(),
        ),
        contribution: Some(user.get("contribution").and_then(Value::as_i64).unwrap_or(0) as i32),
        solved_problems,
    }
}

/// Distinct accepted problems across the submission list.
pub(crate) fn count_solved(submissions: Option<&Vec<Value>>) -> i32 {
    let Some(submissions) = submissions else {
        return 0;
    };
    let mut names = HashSet::new();
    for submission in submissions {
        if submission.get("verdict").and_then(Value::as_str) == Some("OK") {
            if let Some(name) = submission.pointer("/problem/name").and_then(Value::as_str) {
                names.insert(name);
            }
        }
    }
    names.len() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_user_info() {
        let user = json!({
            "rating": 2100,
            "maxRating": 2250,
            "rank": "master",
            "contribution": 37
        });
        let stats = parse_user_info(&user, 412);
        assert_eq!(stats.current_rating, 2100);
        assert_eq!(stats.highest_rating, 2250);
        assert_eq!(stats.rank.as_deref(), Some("master"));
        assert_eq!(stats.contribution, Some(37));
        assert_eq!(stats.solved_problems, 412);
    }

    #[test]
    fn test_unrated_user_defaults() {
        let stats = parse_user_info(&json!({}), 0);
        assert_eq!(stats.current_rating, 0);
        assert_eq!(stats.rank.as_deref(), Some("unrated"));
    }

    #[test]
    fn test_count_solved_distinct_accepted_only() {
        let submissions = vec![
            json!({ "verdict": "OK", "problem": { "name": "Watermelon" } }),
            json!({ "verdict": "OK", "problem": { "name": "Watermelon" } }),
            json!({ "verdict": "WRONG_ANSWER", "problem": { "name": "Theatre Square" } }),
            json!({ "verdict": "OK", "problem": { "name": "Theatre Square" } }),
            json!({ "verdict": "TIME_LIMIT_EXCEEDED", "problem": { "name": "Bit++" } }),
        ];
        assert_eq!(count_solved(Some(&submissions)), 2);
    }

    #[test]
    fn test_count_solved_empty() {
        assert_eq!(count_solved(None), 0);
        assert_eq!(count_solved(Some(&vec![])), 0);
    }
}
