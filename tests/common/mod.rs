//! Scripted in-memory assistant service shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use opendata_bridge::assistant::{
    Annotation, AssistantApi, AssistantDefinition, FileReference, MessageContent,
    RequiredAction, Run, RunStatus, SubmitToolOutputs, TextContent, Thread, ThreadMessage,
    ToolCall, ToolCallFunction, ToolOutput, UploadedFile,
};
use opendata_bridge::error::{BridgeError, Result};

/// A message posted through [`AssistantApi::create_message`].
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub thread_id: String,
    pub content: String,
    pub file_ids: Vec<String>,
}

/// A run created through [`AssistantApi::create_run`].
#[derive(Debug, Clone)]
pub struct CreatedRun {
    pub thread_id: String,
    pub assistant_id: String,
    pub instructions: String,
}

#[derive(Debug, Default)]
struct StubState {
    next_id: usize,
    created_threads: Vec<String>,
    deleted_threads: Vec<String>,
    posted: Vec<PostedMessage>,
    runs: Vec<CreatedRun>,
    scripted_runs: VecDeque<Run>,
    retrieve_calls: usize,
    submitted: Vec<Vec<ToolOutput>>,
    thread_messages: Vec<ThreadMessage>,
    remote_files: HashMap<String, Vec<u8>>,
    uploads: Vec<(String, Vec<u8>)>,
    updated_assistants: Vec<(String, String)>,
    fail_delete: bool,
}

/// In-memory [`AssistantApi`] that records every call.
///
/// `retrieve_run` pops scripted runs in order and answers `completed` once
/// the script is exhausted.
#[derive(Debug, Default)]
pub struct StubApi {
    state: Mutex<StubState>,
    create_thread_delay: Option<Duration>,
    delete_thread_delay: Option<Duration>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_thread` yield for `delay` before answering.
    pub fn with_create_thread_delay(mut self, delay: Duration) -> Self {
        self.create_thread_delay = Some(delay);
        self
    }

    /// Make `delete_thread` yield for `delay` before answering.
    pub fn with_delete_thread_delay(mut self, delay: Duration) -> Self {
        self.delete_thread_delay = Some(delay);
        self
    }

    pub fn script_statuses(&self, statuses: &[RunStatus]) {
        let mut state = self.state.lock().unwrap();
        for status in statuses {
            state.scripted_runs.push_back(run(status.clone(), None));
        }
    }

    pub fn script_run(&self, run: Run) {
        self.state.lock().unwrap().scripted_runs.push_back(run);
    }

    /// Set the newest message returned by `list_messages`.
    pub fn reply_with(&self, message: ThreadMessage) {
        self.state.lock().unwrap().thread_messages.insert(0, message);
    }

    pub fn put_remote_file(&self, file_id: &str, content: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .remote_files
            .insert(file_id.to_string(), content.to_vec());
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }

    pub fn created_threads(&self) -> Vec<String> {
        self.state.lock().unwrap().created_threads.clone()
    }

    pub fn deleted_threads(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_threads.clone()
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn runs(&self) -> Vec<CreatedRun> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn retrieve_calls(&self) -> usize {
        self.state.lock().unwrap().retrieve_calls
    }

    pub fn submitted(&self) -> Vec<Vec<ToolOutput>> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn updated_assistants(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().updated_assistants.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        format!("{prefix}_{}", state.next_id)
    }
}

#[async_trait]
impl AssistantApi for StubApi {
    async fn create_thread(&self) -> Result<Thread> {
        if let Some(delay) = self.create_thread_delay {
            tokio::time::sleep(delay).await;
        }
        let id = self.next_id("thread");
        self.state.lock().unwrap().created_threads.push(id.clone());
        Ok(Thread { id })
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        if let Some(delay) = self.delete_thread_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(BridgeError::Api {
                status: 500,
                message: "delete failed".to_string(),
            });
        }
        state.deleted_threads.push(thread_id.to_string());
        Ok(())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
        file_ids: &[String],
    ) -> Result<ThreadMessage> {
        self.state.lock().unwrap().posted.push(PostedMessage {
            thread_id: thread_id.to_string(),
            content: content.to_string(),
            file_ids: file_ids.to_vec(),
        });
        Ok(text_message("user", content))
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str, instructions: &str) -> Result<Run> {
        self.state.lock().unwrap().runs.push(CreatedRun {
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
            instructions: instructions.to_string(),
        });
        Ok(run(RunStatus::Queued, None))
    }

    async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
        let mut state = self.state.lock().unwrap();
        state.retrieve_calls += 1;
        Ok(state
            .scripted_runs
            .pop_front()
            .unwrap_or_else(|| run(RunStatus::Completed, None)))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run> {
        self.state.lock().unwrap().submitted.push(outputs);
        Ok(run(RunStatus::Queued, None))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
        Ok(self.state.lock().unwrap().thread_messages.clone())
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadedFile> {
        let id = self.next_id("file");
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((filename.to_string(), bytes));
        Ok(UploadedFile { id })
    }

    async fn file_content(&self, file_id: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .remote_files
            .get(file_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("file {file_id}")))
    }

    async fn update_assistant(&self, assistant_id: &str, definition: &AssistantDefinition) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .updated_assistants
            .push((assistant_id.to_string(), definition.name.clone()));
        Ok(())
    }
}

pub fn run(status: RunStatus, required_action: Option<RequiredAction>) -> Run {
    Run {
        id: "run_1".to_string(),
        status,
        required_action,
    }
}

/// A `requires_action` run asking for the given `(name, arguments)` calls.
pub fn requires_action(calls: &[(&str, &str)]) -> Run {
    let tool_calls = calls
        .iter()
        .enumerate()
        .map(|(i, (name, arguments))| ToolCall {
            id: format!("call_{i}"),
            call_type: "function".to_string(),
            function: ToolCallFunction {
                name: (*name).to_string(),
                arguments: (*arguments).to_string(),
            },
        })
        .collect();

    run(
        RunStatus::RequiresAction,
        Some(RequiredAction {
            action_type: "submit_tool_outputs".to_string(),
            submit_tool_outputs: Some(SubmitToolOutputs { tool_calls }),
        }),
    )
}

pub fn text_message(role: &str, value: &str) -> ThreadMessage {
    ThreadMessage {
        id: "msg_1".to_string(),
        role: role.to_string(),
        content: vec![MessageContent::Text {
            text: TextContent {
                value: value.to_string(),
                annotations: Vec::new(),
            },
        }],
    }
}

/// An assistant message whose first annotation points at `file_id`.
pub fn message_with_file(value: &str, file_id: &str) -> ThreadMessage {
    ThreadMessage {
        id: "msg_2".to_string(),
        role: "assistant".to_string(),
        content: vec![MessageContent::Text {
            text: TextContent {
                value: value.to_string(),
                annotations: vec![Annotation {
                    annotation_type: "file_path".to_string(),
                    text: "sandbox:/mnt/data/out.csv".to_string(),
                    file_path: Some(FileReference {
                        file_id: file_id.to_string(),
                    }),
                }],
            },
        }],
    }
}
