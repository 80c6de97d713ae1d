//! Download and delete routes.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

/// Response from the delete route.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: String,
    pub user_id: String,
}

/// GET /download/{user_id}/{file_id}
pub async fn download_file(
    State(state): State<AppState>,
    Path((user_id, file_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = state.sessions.get_file(&user_id, &file_id)?;

    tracing::info!(user_id = %user_id, file_id = %file_id, size = bytes.len(), "Serving file");

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from(bytes),
    )
        .into_response())
}

/// DELETE /delete/{user_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.sessions.remove(&user_id).await?;

    Ok(Json(DeleteResponse {
        status: "deleted".to_string(),
        user_id,
    }))
}
