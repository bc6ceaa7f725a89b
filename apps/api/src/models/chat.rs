use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One user/assistant exchange in `chat_history`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessageRow {
    pub id: i32,
    pub clerk_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
