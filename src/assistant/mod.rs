//! Remote assistant service adapter.
//!
//! This module wraps the hosted Assistants API (Azure `OpenAI` or `OpenAI`)
//! behind the [`AssistantApi`] trait so the run poller and the session store
//! can be driven by either the real HTTP client or a scripted stub.
//!
//! # Overview
//!
//! - [`AssistantClient`]: reqwest-backed implementation
//! - [`RunPoller`]: submits a run and polls it to a terminal outcome
//! - [`Provider`]: URL and authentication differences between providers
//! - [`definitions`]: assistant definitions and instruction texts

pub mod client;
pub mod definitions;
pub mod poller;
pub mod provider;

pub use client::AssistantClient;
pub use poller::{FailedRunPolicy, RunOutcome, RunPoller, RunRequest};
pub use provider::Provider;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Connection settings for the assistant service.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Service endpoint (e.g., `https://my-resource.openai.azure.com`).
    pub endpoint: String,
    /// API key.
    pub api_key: String,
    /// API version sent as `api-version` (Azure only).
    pub api_version: String,
    /// Deployment (model) backing both assistants.
    pub deployment_name: String,
    /// Assistant id used by the chat routes.
    pub chat_assistant_id: String,
    /// Assistant id used by the runner route.
    pub runner_assistant_id: String,
    /// Provider detected from the endpoint.
    pub provider: Provider,
}

/// A remote conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Opaque thread id.
    pub id: String,
}

/// Run lifecycle status reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    /// Any status this build does not know about; polled like `in_progress`.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Status name as sent by the service.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of an assistant against a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Run id.
    pub id: String,
    /// Current status.
    pub status: RunStatus,
    /// Present while `status` is `requires_action`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
}

/// Action the caller must perform before the run can continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredAction {
    /// Action type; only `submit_tool_outputs` is defined.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Tool calls awaiting outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

impl RequiredAction {
    /// Tool calls to answer, if this is a `submit_tool_outputs` action.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match (&self.submit_tool_outputs, self.action_type.as_str()) {
            (Some(outputs), "submit_tool_outputs") => &outputs.tool_calls,
            _ => &[],
        }
    }
}

/// Container of pending tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call.
    pub id: String,
    /// Type of tool (`function` is the only one answered locally).
    #[serde(rename = "type")]
    pub call_type: String,
    /// Function details.
    pub function: ToolCallFunction,
}

/// Function details in a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    /// Function name.
    pub name: String,
    /// Arguments as JSON string.
    pub arguments: String,
}

/// Output answering one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// A message in a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Text of the first content part, if it is a text part.
    #[must_use]
    pub fn primary_text(&self) -> Option<&TextContent> {
        match self.content.first()? {
            MessageContent::Text { text } => Some(text),
            MessageContent::Other => None,
        }
    }
}

/// A content part of a thread message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Text with annotations.
    Text { text: TextContent },
    /// Image files and anything newer.
    #[serde(other)]
    Other,
}

/// Text body and its annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl TextContent {
    /// File id carried by the first annotation, if it references a file.
    #[must_use]
    pub fn first_file_id(&self) -> Option<&str> {
        self.annotations.first()?.file_id()
    }
}

/// An annotation on message text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<FileReference>,
}

impl Annotation {
    #[must_use]
    pub fn file_id(&self) -> Option<&str> {
        self.file_path.as_ref().map(|f| f.file_id.as_str())
    }
}

/// Reference to a file produced by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReference {
    pub file_id: String,
}

/// A file uploaded to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
}

/// Remote assistant definition pushed at startup.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantDefinition {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<serde_json::Value>,
    pub model: String,
}

/// Operations the bridge needs from the assistant service.
///
/// Implementations must be cheap to share; the server holds one behind an
/// `Arc` for its whole lifetime.
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync + std::fmt::Debug {
    /// Create an empty thread.
    async fn create_thread(&self) -> Result<Thread>;

    /// Delete a thread.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Post a user message, optionally attaching uploaded files.
    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
        file_ids: &[String],
    ) -> Result<ThreadMessage>;

    /// Start a run of `assistant_id` on the thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str, instructions: &str)
    -> Result<Run>;

    /// Fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Answer all pending tool calls of a run in one batch.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run>;

    /// List thread messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Upload a file for use by assistants.
    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadedFile>;

    /// Download the raw content of a file.
    async fn file_content(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Overwrite the definition of an existing assistant.
    async fn update_assistant(&self, assistant_id: &str, definition: &AssistantDefinition)
    -> Result<()>;
}
