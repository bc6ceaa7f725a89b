use std::sync::Arc;

use jsonwebtoken::DecodingKey;
use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::platforms::PlatformClient;

/// Shared application state injected into all route handlers via Axum
/// extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    /// Outbound client for the four platform APIs. Shared so the GitHub
    /// rate-limit budget is tracked in one place.
    pub platforms: Arc<PlatformClient>,
    pub config: Config,
    /// Verification key for caller JWTs, built once at startup.
    pub jwt_key: DecodingKey,
}
