use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::profile::CodingProfileRow;
use crate::models::user::UserRow;
use crate::platforms::Platform;
use crate::state::AppState;
use crate::stats;

/// GET /api/users/me
///
/// Returns the caller's user row, creating it on first sight of a new
/// identity.
pub async fn handle_me(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
) -> Result<Json<UserRow>, AppError> {
    if let Some(user) = fetch_user(&state, &clerk_id).await? {
        return Ok(Json(user));
    }

    info!("Creating user record for new identity {clerk_id}");
    let created: Option<UserRow> = sqlx::query_as(
        "INSERT INTO users (clerk_id) VALUES ($1) ON CONFLICT (clerk_id) DO NOTHING RETURNING *",
    )
    .bind(&clerk_id)
    .fetch_optional(&state.db)
    .await?;

    match created {
        Some(user) => Ok(Json(user)),
        // Lost a creation race; the row exists now.
        None => {
            let user = fetch_user(&state, &clerk_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {clerk_id} not found")))?;
            Ok(Json(user))
        }
    }
}

async fn fetch_user(state: &AppState, clerk_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE clerk_id = $1")
        .bind(clerk_id)
        .fetch_optional(&state.db)
        .await
}

#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub leetcode_username: Option<String>,
    #[serde(default)]
    pub github_username: Option<String>,
    #[serde(default)]
    pub codechef_username: Option<String>,
    #[serde(default)]
    pub codeforces_username: Option<String>,
}

impl SettingsUpdate {
    /// Every provided platform username must match its platform's format.
    fn validate(&self) -> Result<(), AppError> {
        let linked = [
            (Platform::LeetCode, &self.leetcode_username),
            (Platform::GitHub, &self.github_username),
            (Platform::CodeChef, &self.codechef_username),
            (Platform::Codeforces, &self.codeforces_username),
        ];
        for (platform, username) in linked {
            if let Some(username) = username {
                if !platform.validate_username(username) {
                    return Err(AppError::InvalidInput(format!(
                        "Invalid {platform} username format"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// PATCH /api/settings
///
/// Partial update of display fields and linked platform usernames. Fields
/// not present in the body are left untouched.
pub async fn handle_update_settings(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<UserRow>, AppError> {
    update.validate()?;

    let user: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users
            (clerk_id, email, username, profile_picture,
             leetcode_username, github_username, codechef_username, codeforces_username)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (clerk_id) DO UPDATE SET
            email = COALESCE(EXCLUDED.email, users.email),
            username = COALESCE(EXCLUDED.username, users.username),
            profile_picture = COALESCE(EXCLUDED.profile_picture, users.profile_picture),
            leetcode_username = COALESCE(EXCLUDED.leetcode_username, users.leetcode_username),
            github_username = COALESCE(EXCLUDED.github_username, users.github_username),
            codechef_username = COALESCE(EXCLUDED.codechef_username, users.codechef_username),
            codeforces_username = COALESCE(EXCLUDED.codeforces_username, users.codeforces_username),
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(&clerk_id)
    .bind(&update.email)
    .bind(&update.username)
    .bind(&update.profile_picture)
    .bind(&update.leetcode_username)
    .bind(&update.github_username)
    .bind(&update.codechef_username)
    .bind(&update.codeforces_username)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(user))
}

/// GET /api/profiles
///
/// Lists the caller's cached coding profiles across all platforms.
pub async fn handle_profiles(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
) -> Result<Json<Vec<CodingProfileRow>>, AppError> {
    let profiles: Vec<CodingProfileRow> =
        sqlx::query_as("SELECT * FROM coding_profiles WHERE clerk_id = $1 ORDER BY platform")
            .bind(&clerk_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(profiles))
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// Platforms for which a background refresh was scheduled.
    pub scheduled: Vec<&'static str>,
}

/// POST /api/sync-profiles
///
/// Schedules a fire-and-forget refresh for every platform the caller has a
/// validly-formatted username linked for. Refresh failures are logged, not
/// surfaced.
pub async fn handle_sync_profiles(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
) -> Result<Json<SyncResponse>, AppError> {
    let user = fetch_user(&state, &clerk_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {clerk_id} not found")))?;

    let linked = [
        (Platform::LeetCode, user.leetcode_username.as_deref()),
        (Platform::GitHub, user.github_username.as_deref()),
        (Platform::CodeChef, user.codechef_username.as_deref()),
        (Platform::Codeforces, user.codeforces_username.as_deref()),
    ];

    let mut scheduled = Vec::new();
    for (platform, username) in linked {
        let Some(username) = username else { continue };
        if !platform.validate_username(username) {
            info!("Skipping sync for {platform}: linked username has invalid format");
            continue;
        }
        stats::spawn_refresh(&state, &clerk_id, platform, username);
        scheduled.push(platform.as_str());
    }

    info!("Scheduled profile sync for {clerk_id}: {scheduled:?}");
    Ok(Json(SyncResponse { scheduled }))
}
