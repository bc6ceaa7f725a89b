use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::Client;
use tracing::warn;

use super::{
    codechef, codeforces, fetch_with_retry, github, leetcode, FetchError, Platform, PlatformStats,
    API_TIMEOUT,
};
use crate::config::Config;

/// Remaining-call budget reported by the GitHub API, owned by the client
/// instance rather than shared as ambient global state.
pub struct RateLimitState {
    remaining: AtomicI64,
    reset_epoch: AtomicI64,
}

/// Pause outbound GitHub calls once the reported budget drops below this.
const RATE_LIMIT_FLOOR: i64 = 50;

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            remaining: AtomicI64::new(5000),
            reset_epoch: AtomicI64::new(0),
        }
    }

    /// Records `x-ratelimit-remaining` / `x-ratelimit-reset` from a response.
    pub fn record(&self, headers: &HeaderMap) {
        if let Some(remaining) = header_i64(headers, "x-ratelimit-remaining") {
            self.remaining.store(remaining, Ordering::Relaxed);
        }
        if let Some(reset) = header_i64(headers, "x-ratelimit-reset") {
            self.reset_epoch.store(reset, Ordering::Relaxed);
        }
    }

    /// How long to wait before the next call, given the current unix time.
    /// `None` when the budget is healthy.
    pub fn backoff_until_reset(&self, now_epoch: i64) -> Option<Duration> {
        if self.remaining.load(Ordering::Relaxed) >= RATE_LIMIT_FLOOR {
            return None;
        }
        let reset = self.reset_epoch.load(Ordering::Relaxed);
        let secs = (reset - now_epoch).max(0) as u64 + 5;
        Some(Duration::from_secs(secs))
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

/// Outbound client for all four platform APIs. Holds one HTTP connection
/// pool, the GitHub token, and the GitHub rate-limit budget.
pub struct PlatformClient {
    http: Client,
    github_token: String,
    github_rate: RateLimitState,
}

impl PlatformClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::builder()
                .timeout(API_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            github_token: config.github_token.clone(),
            github_rate: RateLimitState::new(),
        }
    }

    /// Fetches normalized statistics for one platform, retrying transient
    /// failures per the shared retry policy. Username format must already
    /// have been validated by the caller.
    pub async fn fetch_stats(
        &self,
        platform: Platform,
        username: &str,
    ) -> Result<PlatformStats, FetchError> {
        match platform {
            Platform::LeetCode => {
                fetch_with_retry(|| async {
                    leetcode::fetch(&self.http, username).await.map(PlatformStats::LeetCode)
                })
                .await
            }
            Platform::GitHub => {
                fetch_with_retry(|| async {
                    self.pause_for_github_budget().await;
                    let (stats, headers) =
                        github::fetch(&self.http, &self.github_token, username).await?;
                    self.github_rate.record(&headers);
                    Ok(PlatformStats::GitHub(stats))
                })
                .await
            }
            Platform::CodeChef => {
                fetch_with_retry(|| async {
                    codechef::fetch(&self.http, username).await.map(PlatformStats::CodeChef)
                })
                .await
            }
            Platform::Codeforces => {
                fetch_with_retry(|| async {
                    codeforces::fetch(&self.http, username)
                        .await
                        .map(PlatformStats::Codeforces)
                })
                .await
            }
        }
    }

    async fn pause_for_github_budget(&self) {
        if let Some(delay) = self.github_rate.backoff_until_reset(Utc::now().timestamp()) {
            warn!(
                "GitHub rate limit approaching, sleeping {}s until reset",
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }
    }
}
