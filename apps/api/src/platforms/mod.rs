//! External-platform adapters: one fetcher per coding platform, each
//! normalizing the upstream API's shape into a fixed typed record.

use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;

pub mod client;
pub mod codechef;
pub mod codeforces;
pub mod github;
pub mod leetcode;

pub use client::PlatformClient;
pub use codechef::CodeChefStats;
pub use codeforces::CodeforcesStats;
pub use github::GitHubStats;
pub use leetcode::LeetCodeStats;

/// Outbound request timeout for all platform APIs.
pub const API_TIMEOUT: Duration = Duration::from_secs(25);
/// Total fetch attempts for transient failures.
pub const API_RETRIES: u32 = 3;
/// Base delay for exponential backoff between attempts.
const RETRY_BASE: Duration = Duration::from_secs(1);

/// The closed set of supported platforms. Adding or removing a platform is a
/// compile-time-checked change: every dispatch site matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LeetCode,
    GitHub,
    CodeChef,
    Codeforces,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::LeetCode,
        Platform::GitHub,
        Platform::CodeChef,
        Platform::Codeforces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LeetCode => "leetcode",
            Platform::GitHub => "github",
            Platform::CodeChef => "codechef",
            Platform::Codeforces => "codeforces",
        }
    }

    /// Checks an external username against this platform's handle format.
    /// Must pass before any outbound call is made.
    pub fn validate_username(&self, username: &str) -> bool {
        static LEETCODE_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,25}$").unwrap());
        static GITHUB_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,37}[a-zA-Z0-9])?$").unwrap());
        static CODECHEF_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").unwrap());
        static CODEFORCES_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,24}$").unwrap());

        let re: &Regex = match self {
            Platform::LeetCode => &LEETCODE_RE,
            Platform::GitHub => &GITHUB_RE,
            Platform::CodeChef => &CODECHEF_RE,
            Platform::Codeforces => &CODEFORCES_RE,
        };
        re.is_match(username)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown platform '{0}'")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leetcode" => Ok(Platform::LeetCode),
            "github" => Ok(Platform::GitHub),
            "codechef" => Ok(Platform::CodeChef),
            "codeforces" => Ok(Platform::Codeforces),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// Error taxonomy for platform fetchers. `NotFound` and `BadUpstreamData`
/// are terminal; only `Unavailable` (network/timeout/5xx) is retried, so
/// callers can tell a missing user apart from a flaky upstream.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadUpstreamData(String),

    #[error("{0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Connection failures, timeouts, and body read errors are all
        // transient from the caller's point of view.
        FetchError::Unavailable(e.to_string())
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::NotFound(msg) => AppError::NotFound(msg),
            FetchError::BadUpstreamData(msg) => AppError::BadUpstreamData(msg),
            FetchError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

/// Normalized statistics payload, one variant per platform. Serializes as
/// the bare per-platform object (field set fixed per platform).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PlatformStats {
    LeetCode(LeetCodeStats),
    GitHub(GitHubStats),
    CodeChef(CodeChefStats),
    Codeforces(CodeforcesStats),
}

impl PlatformStats {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformStats::LeetCode(_) => Platform::LeetCode,
            PlatformStats::GitHub(_) => Platform::GitHub,
            PlatformStats::CodeChef(_) => Platform::CodeChef,
            PlatformStats::Codeforces(_) => Platform::Codeforces,
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BASE.mul_f64(1.5f64.powi(attempt as i32))
}

/// Runs `op` up to [`API_RETRIES`] times, sleeping `base × 1.5^attempt`
/// between attempts. Terminal errors (`NotFound`, `BadUpstreamData`) are
/// returned immediately without a retry.
pub async fn fetch_with_retry<T, F, Fut>(mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(FetchError::Unavailable(msg)) if attempt + 1 < API_RETRIES => {
                let delay = backoff_delay(attempt);
                warn!(
                    "Fetch attempt {} failed ({msg}), retrying in {}ms",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_platform_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!("hackerrank".parse::<Platform>().is_err());
        assert!("LeetCode".parse::<Platform>().is_err());
    }

    #[test]
    fn test_leetcode_username_length_bounds() {
        assert!(Platform::LeetCode.validate_username("abc"));
        assert!(Platform::LeetCode.validate_username("some_user-42"));
        // Two characters is below the three-character minimum.
        assert!(!Platform::LeetCode.validate_username("ab"));
        assert!(!Platform::LeetCode.validate_username(&"x".repeat(26)));
    }

    #[test]
    fn test_github_username_hyphen_rules() {
        assert!(Platform::GitHub.validate_username("octocat"));
        assert!(Platform::GitHub.validate_username("a"));
        assert!(Platform::GitHub.validate_username("rust-lang"));
        assert!(!Platform::GitHub.validate_username("-leading"));
        assert!(!Platform::GitHub.validate_username("trailing-"));
        assert!(!Platform::GitHub.validate_username(&"y".repeat(40)));
    }

    #[test]
    fn test_codechef_username_charset() {
        assert!(Platform::CodeChef.validate_username("chef_99"));
        assert!(!Platform::CodeChef.validate_username("chef-99"));
        assert!(!Platform::CodeChef.validate_username("ab"));
    }

    #[test]
    fn test_codeforces_username_bounds() {
        assert!(Platform::Codeforces.validate_username("tourist"));
        assert!(Platform::Codeforces.validate_username("a-b_c"));
        assert!(!Platform::Codeforces.validate_username(&"z".repeat(25)));
    }

    #[test]
    fn test_backoff_delay_grows_by_1_5x() {
        assert_eq!(backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1), Duration::from_millis(1500));
        assert_eq!(backoff_delay(2), Duration::from_millis(2250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_on_unavailable() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fetch_with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::Unavailable("connection refused".into())) }
        })
        .await;
        assert!(matches!(result, Err(FetchError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), API_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_never_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fetch_with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::NotFound("no such user".into())) }
        })
        .await;
        assert!(matches!(result, Err(FetchError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(FetchError::Unavailable("timeout".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fetch_error_maps_to_app_error() {
        assert!(matches!(
            AppError::from(FetchError::NotFound("x".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(FetchError::BadUpstreamData("x".into())),
            AppError::BadUpstreamData(_)
        ));
        assert!(matches!(
            AppError::from(FetchError::Unavailable("x".into())),
            AppError::Unavailable(_)
        ));
    }
}
