//! Chat routes: one assistant turn on the user's thread.

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
};
use chrono::Local;

use super::form::FormFields;
use super::{ResponseMode, respond};
use crate::AppState;
use crate::assistant::RunRequest;
use crate::assistant::definitions::chat_instructions;
use crate::error::{ApiError, Result};
use crate::events::{StreamRecord, outcome_records};
use crate::tools::ToolRegistry;

/// POST /opendata-bridge-chat/chat
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let form = FormFields::from_multipart(multipart).await?;
    let user_id = form.user_id()?;
    let message = form.message()?;

    tracing::info!(user_id = %user_id, is_first = form.is_first, "Received chat request");

    let records = chat_turn(&state, user_id, message, form.is_first, Vec::new()).await?;
    Ok(respond(ResponseMode::from_headers(&headers), records))
}

/// POST /opendata-bridge-chat/chat/file
pub async fn chat_with_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let mut form = FormFields::from_multipart(multipart).await?;
    let file = form.take_file()?;
    let user_id = form.user_id()?;
    let message = form.message()?;

    let filename = file
        .filename
        .clone()
        .unwrap_or_else(|| "upload".to_string());
    let uploaded = state.api.upload_file(&filename, file.bytes.to_vec()).await?;

    tracing::info!(
        user_id = %user_id,
        is_first = form.is_first,
        file_id = %uploaded.id,
        size = file.bytes.len(),
        "Received chat request with file"
    );

    let records = chat_turn(&state, user_id, message, form.is_first, vec![uploaded.id]).await?;
    Ok(respond(ResponseMode::from_headers(&headers), records))
}

/// Post the user message to the user's thread and run the chat assistant.
async fn chat_turn(
    state: &AppState,
    user_id: &str,
    message: &str,
    is_first: bool,
    file_ids: Vec<String>,
) -> Result<Vec<StreamRecord>> {
    let thread_id = state.sessions.ensure_thread(user_id, is_first).await?;

    state
        .api
        .create_message(&thread_id, message, &file_ids)
        .await?;

    let instructions = chat_instructions(user_id, Local::now());
    let tools = ToolRegistry::none();
    let outcome = state
        .poller
        .run(RunRequest {
            user_id,
            thread_id: &thread_id,
            assistant_id: &state.assistants.chat,
            instructions: &instructions,
            tools: &tools,
        })
        .await?;

    Ok(outcome_records(&outcome))
}
