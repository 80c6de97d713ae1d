//! HTTP routes.
//!
//! - `POST /opendata-bridge-chat/chat` and `/opendata-bridge-chat/chat/file`:
//!   conversational table extraction on the user's thread
//! - `POST /opendata-bridge-runner/run/file`: one-shot script job on an
//!   uploaded file
//! - `GET /download/{user_id}/{file_id}`: raw bytes of a stored file
//! - `DELETE /delete/{user_id}`: drop a user's session and remote thread
//!
//! Chat and runner routes answer with an SSE stream of [`StreamRecord`]s, or
//! with one JSON object when the caller asks for `application/json`.

pub mod chat;
pub mod files;
pub mod form;
pub mod runner;

use axum::{
    Json, Router,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::AppState;
use crate::events::{ChatResponse, StreamRecord, build_sse_response};

/// Build the API router (without the root path prefix).
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/opendata-bridge-chat/chat", post(chat::chat))
        .route("/opendata-bridge-chat/chat/file", post(chat::chat_with_file))
        .route("/opendata-bridge-runner/run/file", post(runner::run_file))
        .route("/download/{user_id}/{file_id}", get(files::download_file))
        .route("/delete/{user_id}", delete(files::delete_session))
}

/// How a route delivers its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// `text/event-stream`, one event per record.
    Stream,
    /// A single JSON object.
    Json,
}

impl ResponseMode {
    /// JSON when the `Accept` header asks for it and not for event streams.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if accept.contains("application/json") && !accept.contains("text/event-stream") {
            Self::Json
        } else {
            Self::Stream
        }
    }
}

/// Render records in the requested mode.
pub fn respond(mode: ResponseMode, records: Vec<StreamRecord>) -> Response {
    match mode {
        ResponseMode::Stream => build_sse_response(records).into_response(),
        ResponseMode::Json => Json(ChatResponse::from_records(&records)).into_response(),
    }
}
