use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::advisor::prompts;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::chat::ChatMessageRow;
use crate::state::AppState;

/// How many past exchanges are replayed into the chat prompt.
const CHAT_HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Extracted resume text. Extraction from PDF happens upstream.
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// POST /analyze
///
/// Proxies the resume text (and optional job description) to the LLM and
/// returns its structured evaluation.
pub async fn handle_analyze(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "resume_text cannot be empty".to_string(),
        ));
    }

    info!("Analyzing resume for {clerk_id}");

    let prompt =
        prompts::build_analysis_prompt(&request.resume_text, request.job_description.as_deref());
    let analysis = state
        .llm
        .generate(&prompt, prompts::ANALYST_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    Ok(Json(AnalyzeResponse { analysis }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub session_id: String,
}

/// POST /chat
///
/// Career-advice chat. Replays the caller's recent history into the prompt,
/// persists the new exchange, and returns the advisor's reply.
pub async fn handle_chat(
    State(state): State<AppState>,
    AuthUser(clerk_id): AuthUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::InvalidInput("content cannot be empty".to_string()));
    }

    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut history: Vec<ChatMessageRow> = sqlx::query_as(
        r#"
        SELECT * FROM chat_history
        WHERE clerk_id = $1 AND session_id = $2
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(&clerk_id)
    .bind(&session_id)
    .bind(CHAT_HISTORY_LIMIT)
    .fetch_all(&state.db)
    .await?;
    history.reverse(); // oldest-first for the transcript

    let prompt = prompts::build_chat_prompt(&history, &request.content);
    let reply = state
        .llm
        .generate(&prompt, prompts::ADVISOR_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO chat_history (clerk_id, user_message, ai_response, session_id)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&clerk_id)
    .bind(&request.content)
    .bind(&reply)
    .bind(&session_id)
    .execute(&state.db)
    .await?;

    Ok(Json(ChatResponse {
        content: reply,
        session_id,
    }))
}
