//! Stats orchestrator: decides per request whether to serve cached data,
//! schedule a background refresh, or block on a synchronous fetch.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::platforms::{Platform, PlatformStats};
use crate::state::AppState;

pub mod cache;
pub mod handlers;

/// Maximum age before a cached profile is considered stale.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 30;
/// A fresh hit with less than this much freshness remaining also schedules
/// a background refresh.
pub const NEAR_EXPIRY_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    NearExpiry,
    Stale,
}

pub fn classify(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
    let age = now - last_updated;
    if age >= Duration::minutes(FRESHNESS_WINDOW_MINUTES) {
        Freshness::Stale
    } else if age > Duration::minutes(FRESHNESS_WINDOW_MINUTES - NEAR_EXPIRY_MARGIN_MINUTES) {
        Freshness::NearExpiry
    } else {
        Freshness::Fresh
    }
}

/// Per-request decision path for `GET /platform/{platform}/{username}`.
///
/// Cached payloads that fail shape validation are treated exactly like
/// stale ones: they force a synchronous fetch. A successful synchronous
/// fetch returns immediately; the cache write-back runs in the background,
/// so a client may see fresh data before it is durable.
pub async fn get_platform_stats(
    state: &AppState,
    clerk_id: &str,
    platform: Platform,
    username: &str,
) -> Result<PlatformStats, AppError> {
    if !platform.validate_username(username) {
        return Err(AppError::InvalidInput(format!(
            "Invalid {platform} username format"
        )));
    }

    if let Some(row) = cache::get(&state.db, clerk_id, platform).await? {
        match classify(row.last_updated, Utc::now()) {
            freshness @ (Freshness::Fresh | Freshness::NearExpiry) => {
                match cache::decode_cached(platform, &row) {
                    Ok(stats) => {
                        if freshness == Freshness::NearExpiry {
                            debug!(
                                "Cached {platform} profile for {clerk_id} is near expiry, \
                                 scheduling background refresh"
                            );
                            spawn_refresh(state, clerk_id, platform, username);
                        }
                        debug!("Serving cached {platform} profile for {clerk_id}");
                        return Ok(stats);
                    }
                    Err(e) => {
                        warn!(
                            "Cached {platform} data for {clerk_id} failed validation, \
                             forcing refresh: {e}"
                        );
                    }
                }
            }
            Freshness::Stale => {
                info!("Cached {platform} profile for {clerk_id} expired, fetching fresh");
            }
        }
    }

    let stats = state.platforms.fetch_stats(platform, username).await?;

    // The response does not wait for the write-back; its failure is logged
    // and dropped.
    spawn_write_back(state, clerk_id, username, stats.clone());

    Ok(stats)
}

fn spawn_write_back(state: &AppState, clerk_id: &str, username: &str, stats: PlatformStats) {
    let db = state.db.clone();
    let clerk_id = clerk_id.to_string();
    let username = username.to_string();
    tokio::spawn(async move {
        let platform = stats.platform();
        if let Err(e) = cache::upsert(&db, &clerk_id, &username, &stats).await {
            error!("Cache write-back for {platform}/{clerk_id} failed: {e}");
        } else {
            debug!("Cache write-back for {platform}/{clerk_id} committed");
        }
    });
}

/// Fire-and-forget fetch-and-store. Failures never surface to any request.
pub fn spawn_refresh(state: &AppState, clerk_id: &str, platform: Platform, username: &str) {
    let db = state.db.clone();
    let platforms = state.platforms.clone();
    let clerk_id = clerk_id.to_string();
    let username = username.to_string();
    tokio::spawn(async move {
        match platforms.fetch_stats(platform, &username).await {
            Ok(stats) => {
                if let Err(e) = cache::upsert(&db, &clerk_id, &username, &stats).await {
                    error!("Background {platform} refresh write for {clerk_id} failed: {e}");
                }
            }
            Err(e) => {
                warn!("Background {platform} refresh for {clerk_id} failed: {e}");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
        now - Duration::minutes(minutes)
    }

    #[test]
    fn test_young_cache_is_fresh() {
        let now = Utc::now();
        assert_eq!(classify(minutes_ago(now, 0), now), Freshness::Fresh);
        assert_eq!(classify(minutes_ago(now, 10), now), Freshness::Fresh);
        assert_eq!(classify(minutes_ago(now, 24), now), Freshness::Fresh);
    }

    #[test]
    fn test_exactly_at_margin_is_still_fresh() {
        // 25 minutes old leaves exactly 5 minutes of freshness, which is
        // not yet under the margin.
        let now = Utc::now();
        assert_eq!(classify(minutes_ago(now, 25), now), Freshness::Fresh);
    }

    #[test]
    fn test_under_margin_is_near_expiry() {
        let now = Utc::now();
        assert_eq!(classify(minutes_ago(now, 26), now), Freshness::NearExpiry);
        assert_eq!(classify(minutes_ago(now, 29), now), Freshness::NearExpiry);
    }

    #[test]
    fn test_window_boundary_is_stale() {
        let now = Utc::now();
        assert_eq!(classify(minutes_ago(now, 30), now), Freshness::Stale);
        assert_eq!(classify(minutes_ago(now, 300), now), Freshness::Stale);
    }
}
