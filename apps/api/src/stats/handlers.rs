use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::platforms::{Platform, PlatformStats};
use crate::state::AppState;

/// GET /platform/:platform/:username
///
/// Returns the normalized statistics payload for one platform, served from
/// cache when fresh enough.
pub async fn handle_platform_stats(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
    Path((platform, username)): Path<(String, String)>,
) -> Result<Json<PlatformStats>, AppError> {
    let platform: Platform = platform
        .parse()
        .map_err(|e: crate::platforms::UnknownPlatform| AppError::InvalidInput(e.to_string()))?;

    info!("Fetching {platform} stats for '{username}' ({clerk_id})");

    let stats = super::get_platform_stats(&state, &clerk_id, platform, &username).await?;
    Ok(Json(stats))
}
