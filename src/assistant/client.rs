//! reqwest-backed [`AssistantApi`] implementation.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{BridgeError, Result};

use super::{
    AssistantApi, AssistantDefinition, AssistantSettings, Run, Thread, ThreadMessage, ToolOutput,
    UploadedFile,
};

/// Paged list envelope returned by list endpoints.
#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// HTTP client for the Assistants API.
#[derive(Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    settings: AssistantSettings,
}

impl std::fmt::Debug for AssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantClient")
            .field("endpoint", &self.settings.endpoint)
            .field("provider", &self.settings.provider)
            .finish_non_exhaustive()
    }
}

impl AssistantClient {
    /// Create a new client with the given settings.
    #[must_use]
    pub fn new(settings: AssistantSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self
            .settings
            .provider
            .build_url(&self.settings.endpoint, path);
        let rb = self.http.request(method, url);
        self.settings
            .provider
            .authorize(rb, &self.settings.api_key)
    }

    async fn send(rb: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = rb.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp.text().await.unwrap_or_default();
        Err(BridgeError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(rb: reqwest::RequestBuilder) -> Result<T> {
        let resp = Self::send(rb).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl AssistantApi for AssistantClient {
    async fn create_thread(&self) -> Result<Thread> {
        let rb = self.request(reqwest::Method::POST, "threads").json(&json!({}));
        Self::send_json(rb).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let rb = self.request(reqwest::Method::DELETE, &format!("threads/{thread_id}"));
        Self::send(rb).await?;
        Ok(())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
        file_ids: &[String],
    ) -> Result<ThreadMessage> {
        let mut body = json!({
            "role": "user",
            "content": content,
        });
        if !file_ids.is_empty() {
            body["file_ids"] = json!(file_ids);
        }

        let rb = self
            .request(reqwest::Method::POST, &format!("threads/{thread_id}/messages"))
            .json(&body);
        Self::send_json(rb).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> Result<Run> {
        let rb = self
            .request(reqwest::Method::POST, &format!("threads/{thread_id}/runs"))
            .json(&json!({
                "assistant_id": assistant_id,
                "instructions": instructions,
            }));
        Self::send_json(rb).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let rb = self.request(
            reqwest::Method::GET,
            &format!("threads/{thread_id}/runs/{run_id}"),
        );
        Self::send_json(rb).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run> {
        let rb = self
            .request(
                reqwest::Method::POST,
                &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            )
            .json(&json!({ "tool_outputs": outputs }));
        Self::send_json(rb).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let rb = self.request(
            reqwest::Method::GET,
            &format!("threads/{thread_id}/messages"),
        );
        let list: ListResponse<ThreadMessage> = Self::send_json(rb).await?;
        Ok(list.data)
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadedFile> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let rb = self.request(reqwest::Method::POST, "files").multipart(form);
        Self::send_json(rb).await
    }

    async fn file_content(&self, file_id: &str) -> Result<Vec<u8>> {
        let rb = self.request(reqwest::Method::GET, &format!("files/{file_id}/content"));
        let resp = Self::send(rb).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        definition: &AssistantDefinition,
    ) -> Result<()> {
        let rb = self
            .request(reqwest::Method::POST, &format!("assistants/{assistant_id}"))
            .json(definition);
        Self::send(rb).await?;
        Ok(())
    }
}
