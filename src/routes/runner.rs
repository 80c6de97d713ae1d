//! Runner route: apply a user script to an uploaded file.
//!
//! The upload is copied to `<work_dir>/<uuid>`. The runner assistant reviews
//! the script, rewrites its file names to that uuid and calls
//! `format_file_job`, which executes it with `work_dir` as cwd. The edited
//! copy is then stored in the user's session under the uuid.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
};
use uuid::Uuid;

use super::form::FormFields;
use super::{ResponseMode, respond};
use crate::AppState;
use crate::assistant::definitions::runner_prompt;
use crate::assistant::{AssistantApi, RunRequest};
use crate::error::{ApiError, BridgeError, Result};
use crate::events::{StreamRecord, outcome_records};
use crate::tools::{ScriptExecutor, ToolRegistry};

/// POST /opendata-bridge-runner/run/file
pub async fn run_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let mut form = FormFields::from_multipart(multipart).await?;
    let file = form.take_file()?;
    let user_id = form.user_id()?.to_string();
    let script = form.script()?.to_string();

    let work_dir = state.runner.work_dir.clone();
    let filename = Uuid::new_v4().to_string();
    let path = work_dir.join(&filename);

    tokio::fs::create_dir_all(&work_dir)
        .await
        .map_err(BridgeError::from)?;
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(BridgeError::from)?;

    tracing::info!(
        user_id = %user_id,
        file_id = %filename,
        size = file.bytes.len(),
        "Starting runner job"
    );

    let job = RunnerJob {
        state: &state,
        user_id: &user_id,
        filename: &filename,
        path: &path,
        work_dir: &work_dir,
    };
    let mut thread_id = None;
    let result = job.execute(&script, file.bytes.to_vec(), &mut thread_id).await;

    spawn_cleanup(Arc::clone(&state.api), thread_id, path);

    Ok(respond(ResponseMode::from_headers(&headers), result?))
}

struct RunnerJob<'a> {
    state: &'a AppState,
    user_id: &'a str,
    filename: &'a str,
    path: &'a Path,
    work_dir: &'a Path,
}

impl RunnerJob<'_> {
    /// Run the job; `thread_slot` receives the thread id as soon as one
    /// exists so the caller can clean it up even on failure.
    async fn execute(
        &self,
        script: &str,
        content: Vec<u8>,
        thread_slot: &mut Option<String>,
    ) -> Result<Vec<StreamRecord>> {
        let api = &self.state.api;

        let uploaded = api.upload_file(self.filename, content).await?;
        let thread = api.create_thread().await?;
        *thread_slot = Some(thread.id.clone());

        let prompt = runner_prompt(self.filename, script);
        api.create_message(&thread.id, &prompt, &[uploaded.id])
            .await?;

        let executor = ScriptExecutor::new(
            self.state.runner.interpreter.clone(),
            self.work_dir.to_path_buf(),
        );
        let tools = ToolRegistry::runner(Arc::new(executor));

        let outcome = self
            .state
            .poller
            .run(RunRequest {
                user_id: self.user_id,
                thread_id: &thread.id,
                assistant_id: &self.state.assistants.runner,
                instructions: &prompt,
                tools: &tools,
            })
            .await?;

        let edited = tokio::fs::read(self.path).await?;
        self.state
            .sessions
            .record_file(self.user_id, self.filename, edited);

        let mut records = outcome_records(&outcome);
        records.push(StreamRecord::File {
            file_id: self.filename.to_string(),
        });
        Ok(records)
    }
}

/// Best-effort removal of the job thread and the local copy.
fn spawn_cleanup(api: Arc<dyn AssistantApi>, thread_id: Option<String>, path: PathBuf) {
    tokio::spawn(async move {
        if let Some(thread_id) = thread_id {
            match api.delete_thread(&thread_id).await {
                Ok(()) => tracing::info!(thread_id = %thread_id, "Runner thread deleted"),
                Err(e) => {
                    tracing::warn!(thread_id = %thread_id, error = %e, "Failed to delete runner thread");
                }
            }
        }

        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove job file");
            }
        }
    });
}
