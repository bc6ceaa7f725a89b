use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, NaiveDate, Utc};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::FetchError;

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Contributions-graph query: one year of daily contribution counts plus
/// owned-repo stars, forks, and language sizes in a single round trip.
const STATS_QUERY: &str = r#"query($username: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $username) {
    contributionsCollection(from: $from, to: $to) {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            contributionCount
            date
          }
        }
      }
    }
    repositories(first: 100, ownerAffiliations: OWNER, orderBy: {field: PUSHED_AT, direction: DESC}) {
      totalCount
      nodes {
        stargazerCount
        forkCount
        languages(first: 5, orderBy: {field: SIZE, direction: DESC}) {
          edges {
            size
            node { name }
          }
          totalSize
        }
      }
    }
  }
}"#;

/// Keep at most this many languages in the histogram.
const TOP_LANGUAGES: usize = 5;
/// Languages below this share of total bytes are dropped.
const MIN_LANGUAGE_PERCENTAGE: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitHubStats {
    pub total_contributions: i32,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    /// Stars received on owned repositories.
    pub total_stars: Option<i32>,
    pub total_forks: Option<i32>,
    /// Language usage percentages over owned repos, name → percent.
    #[serde(default)]
    pub languages: BTreeMap<String, f64>,
}

pub(crate) async fn fetch(
    http: &Client,
    token: &str,
    username: &str,
) -> Result<(GitHubStats, HeaderMap), FetchError> {
    let to = Utc::now();
    let from = to - Duration::days(365);

    let response = http
        .post(GRAPHQL_URL)
        .bearer_auth(token)
        .header("user-agent", "nexus-api")
        .json(&json!({
            "query": STATS_QUERY,
            "variables": {
                "username": username,
                "from": from.to_rfc3339(),
                "to": to.to_rfc3339(),
            },
        }))
        .send()
        .await?;

    let status = response.status();
    let headers = response.headers().clone();

    if status.as_u16() == 401 {
        return Err(FetchError::BadUpstreamData(
            "GitHub API authentication failed, check GITHUB_TOKEN".into(),
        ));
    }
    if status.is_server_error() {
        return Err(FetchError::Unavailable(format!(
            "GitHub API returned {status}"
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| FetchError::BadUpstreamData(format!("GitHub response not JSON: {e}")))?;

    let stats = parse_response(&body, username, to.date_naive())?;
    Ok((stats, headers))
}

/// Normalizes the GraphQL response. GraphQL-level errors arrive with HTTP
/// 200, so they are inspected before the data section.
pub(crate) fn parse_response(
    body: &Value,
    username: &str,
    today: NaiveDate,
) -> Result<GitHubStats, FetchError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let message = errors
            .first()
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown GraphQL error");
        if message.contains("Could not resolve to a User") {
            return Err(FetchError::NotFound(format!(
                "GitHub user '{username}' not found"
            )));
        }
        return Err(FetchError::BadUpstreamData(format!(
            "GitHub GraphQL error: {message}"
        )));
    }

    let user = match body.pointer("/data/user") {
        Some(user) if !user.is_null() => user,
        _ => {
            return Err(FetchError::NotFound(format!(
                "GitHub user '{username}' not found"
            )))
        }
    };

    let calendar = user.pointer("/contributionsCollection/contributionCalendar");
    let total_contributions = calendar
        .and_then(|c| c.get("totalContributions"))
        .and_then(Value::as_i64)
        .unwrap_or(0) as i32;

    let mut contribution_dates = BTreeSet::new();
    if let Some(weeks) = calendar.and_then(|c| c.get("weeks")).and_then(Value::as_array) {
        for week in weeks {
            let Some(days) = week.get("contributionDays").and_then(Value::as_array) else {
                continue;
            };
            for day in days {
                let count = day.get("contributionCount").and_then(Value::as_i64).unwrap_or(0);
                if count > 0 {
                    if let Some(date) = day
                        .get("date")
                        .and_then(Value::as_str)
                        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    {
                        contribution_dates.insert(date);
                    }
                }
            }
        }
    }

    let (current_streak, longest_streak) = compute_streaks(&contribution_dates, today);

    let mut total_stars = 0i32;
    let mut total_forks = 0i32;
    let mut language_bytes: HashMap<String, i64> = HashMap::new();
    let mut total_language_bytes = 0i64;

    if let Some(repos) = user.pointer("/repositories/nodes").and_then(Value::as_array) {
        for repo in repos {
            total_stars += repo.get("stargazerCount").and_then(Value::as_i64).unwrap_or(0) as i32;
            total_forks += repo.get("forkCount").and_then(Value::as_i64).unwrap_or(0) as i32;

            let Some(edges) = repo.pointer("/languages/edges").and_then(Value::as_array) else {
                continue;
            };
            for edge in edges {
                let size = edge.get("size").and_then(Value::as_i64).unwrap_or(0);
                let name = edge.pointer("/node/name").and_then(Value::as_str);
                if let (Some(name), true) = (name, size > 0) {
                    // Cython counts as Python in the aggregate.
                    let name = if name == "Cython" { "Python" } else { name };
                    *language_bytes.entry(name.to_string()).or_insert(0) += size;
                    total_language_bytes += size;
                }
            }
        }
    }

    Ok(GitHubStats {
        total_contributions,
        current_streak: Some(current_streak),
        longest_streak: Some(longest_streak),
        total_stars: Some(total_stars),
        total_forks: Some(total_forks),
        languages: language_percentages(&language_bytes, total_language_bytes),
    })
}

/// Computes (current, longest) contribution streaks in days. The current
/// streak survives a gap of zero days: it counts back from today, or from
/// yesterday when today has no contributions yet.
pub(crate) fn compute_streaks(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> (i32, i32) {
    if dates.is_empty() {
        return (0, 0);
    }

    let mut longest = 0i32;
    let mut run = 0i32;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates {
        run = match previous {
            Some(prev) if date == prev + Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    let yesterday = today - Duration::days(1);
    let anchor = if dates.contains(&today) {
        Some(today)
    } else if dates.contains(&yesterday) {
        Some(yesterday)
    } else {
        None
    };

    let current = match anchor {
        Some(mut day) => {
            let mut count = 0i32;
            while dates.contains(&day) {
                count += 1;
                day = day - Duration::days(1);
            }
            count
        }
        None => 0,
    };

    (current, longest)
}

/// Converts per-language byte counts into top-5 rounded percentages,
/// dropping languages below the 0.1% floor.
pub(crate) fn language_percentages(
    language_bytes: &HashMap<String, i64>,
    total_bytes: i64,
) -> BTreeMap<String, f64> {
    if total_bytes <= 0 {
        return BTreeMap::new();
    }

    let mut sorted: Vec<_> = language_bytes.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut result = BTreeMap::new();
    for (name, &bytes) in sorted.into_iter().take(TOP_LANGUAGES) {
        let percentage = (bytes as f64 / total_bytes as f64 * 1000.0).round() / 10.0;
        if percentage >= MIN_LANGUAGE_PERCENTAGE {
            result.insert(name.clone(), percentage);
        }
    }
    result
}
