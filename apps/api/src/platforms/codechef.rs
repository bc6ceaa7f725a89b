use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FetchError;

const API_BASE: &str = "https://codechef-api.vercel.app/handle";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChefStats {
    pub current_rating: i32,
    pub highest_rating: i32,
    pub global_rank: i32,
    pub country_rank: i32,
    pub stars: i32,
}

pub(crate) async fn fetch(http: &Client, username: &str) -> Result<CodeChefStats, FetchError> {
    let url = format!("{API_BASE}/{username}");
    let response = http.get(&url).send().await?;

    let status = response.status();
    if status.as_u16() == 404 {
        return Err(FetchError::NotFound(format!(
            "CodeChef user '{username}' not found"
        )));
    }

    let text = response.text().await?;

    // The unofficial API reports an unknown handle as a 500 with
    // "User not Found" in the body.
    if status.as_u16() == 500 && text.contains("User not Found") {
        return Err(FetchError::NotFound(format!(
            "CodeChef user '{username}' not found"
        )));
    }
    if status.is_server_error() {
        return Err(FetchError::Unavailable(format!(
            "CodeChef API returned {status}"
        )));
    }
    if !status.is_success() {
        return Err(FetchError::BadUpstreamData(format!(
            "CodeChef API returned {status}"
        )));
    }

    let body: Value = serde_json::from_str(&text)
        .map_err(|e| FetchError::BadUpstreamData(format!("CodeChef response not JSON: {e}")))?;

    parse_response(&body)
}

pub(crate) fn parse_response(body: &Value) -> Result<CodeChefStats, FetchError> {
    if !body.is_object() {
        return Err(FetchError::BadUpstreamData(
            "CodeChef API returned a non-object payload".into(),
        ));
    }

    let int_field = |name: &str| body.get(name).and_then(Value::as_i64).unwrap_or(0) as i32;

    Ok(CodeChefStats {
        current_rating: int_field("currentRating"),
        highest_rating: int_field("highestRating"),
        global_rank: int_field("globalRank"),
        country_rank: int_field("countryRank"),
        stars: clean_stars(body.get("stars")),
    })
}

/// The API decorates the star count ("4★", "2*"); extract the digits.
/// Unparseable or absent values default to 0.
pub(crate) fn clean_stars(raw: Option<&Value>) -> i32 {
    static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
    match raw {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) as i32,
        Some(Value::String(s)) => DIGITS_RE
            .find(s)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_typical_response() {
        let body = json!({
            "currentRating": 1843,
            "highestRating": 1902,
            "globalRank": 12045,
            "countryRank": 1404,
            "stars": "4★"
        });
        let stats = parse_response(&body).unwrap();
        assert_eq!(stats.current_rating, 1843);
        assert_eq!(stats.highest_rating, 1902);
        assert_eq!(stats.global_rank, 12045);
        assert_eq!(stats.country_rank, 1404);
        assert_eq!(stats.stars, 4);
    }

    #[test]
    fn test_clean_stars_variants() {
        assert_eq!(clean_stars(Some(&json!("4★"))), 4);
        assert_eq!(clean_stars(Some(&json!("2*"))), 2);
        assert_eq!(clean_stars(Some(&json!(6))), 6);
        assert_eq!(clean_stars(Some(&json!("unrated"))), 0);
        assert_eq!(clean_stars(Some(&json!(null))), 0);
        assert_eq!(clean_stars(None), 0);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let stats = parse_response(&json!({ "stars": "1★" })).unwrap();
        assert_eq!(stats.current_rating, 0);
        assert_eq!(stats.stars, 1);
    }

    #[test]
    fn test_non_object_payload_is_bad_upstream() {
        assert!(matches!(
            parse_response(&json!([1, 2, 3])).unwrap_err(),
            FetchError::BadUpstreamData(_)
        ));
    }
}
