use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row in `users`, keyed by the identity provider's subject id.
/// Platform usernames here are display-time convenience copies; the
/// authoritative per-platform state lives in `coding_profiles`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub clerk_id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub leetcode_username: Option<String>,
    pub github_username: Option<String>,
    pub codechef_username: Option<String>,
    pub codeforces_username: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
