//! Caller identity extraction. Token issuance and key distribution belong
//! to the identity provider; this module only verifies the bearer JWT and
//! pulls out the subject id.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

/// The authenticated caller's identity-provider subject id.
/// Add as a handler argument to require authentication.
pub struct AuthUser(pub String);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

        let mut validation = Validation::new(Algorithm::RS256);
        // The provider rotates issuer hosts between environments; the
        // signature check is what we rely on.
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &state.jwt_key, &validation).map_err(|e| {
            debug!("Token verification failed: {e}");
            AppError::Unauthorized
        })?;

        Ok(AuthUser(data.claims.sub))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Builds the verification key from the configured PEM. Called once at
/// startup.
pub fn decoding_key(pem: &str) -> anyhow::Result<DecodingKey> {
    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| anyhow::anyhow!("CLERK_JWT_PUBLIC_KEY is not a valid RSA PEM: {e}"))
}
