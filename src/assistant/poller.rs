//! Run submission and status polling.
//!
//! The poller manages the lifecycle of one assistant run:
//! 1. Create the run on the thread
//! 2. Poll its status, sleeping between polls while it is in progress
//! 3. Answer `requires_action` tool calls through the [`ToolRegistry`]
//! 4. Map the terminal status to a [`RunOutcome`]
//! 5. Download any file the final message references into the session store
//!
//! There is no iteration bound, timeout or cancellation: the loop ends only
//! when the service reports a terminal status or a call fails.
//!
//! # Example
//!
//! ```rust,ignore
//! let poller = RunPoller::new(api, sessions);
//! let outcome = poller
//!     .run(RunRequest {
//!         user_id: "alice",
//!         thread_id: &thread_id,
//!         assistant_id: &assistant_id,
//!         instructions: &instructions,
//!         tools: &ToolRegistry::none(),
//!     })
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::SessionStore;
use crate::tools::{ToolInvocation, ToolRegistry};

use super::{AssistantApi, Run, RunStatus, ToolOutput};

/// Delay between status polls while a run is in progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Message returned when the run fails.
pub const FAILED_MESSAGE: &str = "Failed. Please try again.";
/// Message returned when the run expires.
pub const EXPIRED_MESSAGE: &str = "Expired. Please try again.";
/// Message returned when the run is cancelled.
pub const CANCELLED_MESSAGE: &str = "Cancelled. Please try again.";

/// What to answer when a run ends in `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedRunPolicy {
    /// Answer [`FAILED_MESSAGE`].
    #[default]
    Placeholder,
    /// Answer the newest thread message prefixed with `Failed: `, falling
    /// back to [`FAILED_MESSAGE`] when there is no text to echo.
    EchoLastMessage,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Text to show the user.
    pub message: String,
    /// Remote file produced by the run, already copied into the session store.
    pub file_id: Option<String>,
}

impl RunOutcome {
    fn placeholder(message: &str) -> Self {
        Self {
            message: message.to_string(),
            file_id: None,
        }
    }
}

/// Inputs of one run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    /// User whose session receives produced files.
    pub user_id: &'a str,
    pub thread_id: &'a str,
    pub assistant_id: &'a str,
    /// Per-run instructions overriding the assistant's.
    pub instructions: &'a str,
    /// Tools the model may call during this run.
    pub tools: &'a ToolRegistry,
}

/// Submits runs and polls them to completion.
#[derive(Debug, Clone)]
pub struct RunPoller {
    api: Arc<dyn AssistantApi>,
    sessions: SessionStore,
    interval: Duration,
    failed_policy: FailedRunPolicy,
}

impl RunPoller {
    /// Create a poller with the default interval and failed-run policy.
    #[must_use]
    pub fn new(api: Arc<dyn AssistantApi>, sessions: SessionStore) -> Self {
        Self {
            api,
            sessions,
            interval: DEFAULT_POLL_INTERVAL,
            failed_policy: FailedRunPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_failed_policy(mut self, policy: FailedRunPolicy) -> Self {
        self.failed_policy = policy;
        self
    }

    /// Create a run, poll it to a terminal outcome and store any produced
    /// file for the user.
    pub async fn run(&self, req: RunRequest<'_>) -> Result<RunOutcome> {
        let run = self
            .api
            .create_run(req.thread_id, req.assistant_id, req.instructions)
            .await?;

        tracing::info!(
            user_id = %req.user_id,
            thread_id = %req.thread_id,
            run_id = %run.id,
            "Run created"
        );

        let outcome = self.poll(&req, &run.id).await?;

        if let Some(file_id) = &outcome.file_id {
            let content = self.api.file_content(file_id).await?;
            tracing::info!(
                user_id = %req.user_id,
                file_id = %file_id,
                size = content.len(),
                "Stored file produced by run"
            );
            self.sessions.record_file(req.user_id, file_id.clone(), content);
        }

        Ok(outcome)
    }

    /// A `requires_action` batch with no function calls submits nothing and
    /// is polled again after the interval; the service leaves such a run
    /// waiting until it expires.
    async fn poll(&self, req: &RunRequest<'_>, run_id: &str) -> Result<RunOutcome> {
        let mut iteration: u64 = 0;

        loop {
            iteration += 1;
            let run = self.api.retrieve_run(req.thread_id, run_id).await?;

            tracing::info!(
                thread_id = %req.thread_id,
                run_id = %run_id,
                iteration = iteration,
                status = %run.status,
                "run status"
            );

            match run.status {
                RunStatus::Completed => return self.completed_outcome(req.thread_id).await,
                RunStatus::Failed => return self.failed_outcome(req.thread_id).await,
                RunStatus::Expired => return Ok(RunOutcome::placeholder(EXPIRED_MESSAGE)),
                RunStatus::Cancelled => return Ok(RunOutcome::placeholder(CANCELLED_MESSAGE)),
                RunStatus::RequiresAction => {
                    let outputs = self.dispatch_tools(&run, req.tools).await?;
                    if !outputs.is_empty() {
                        tracing::info!(
                            run_id = %run_id,
                            output_count = outputs.len(),
                            "Submitting tool outputs"
                        );
                        self.api
                            .submit_tool_outputs(req.thread_id, run_id, outputs)
                            .await?;
                        continue;
                    }
                    tracing::warn!(run_id = %run_id, "requires_action without function calls");
                }
                RunStatus::Queued
                | RunStatus::InProgress
                | RunStatus::Cancelling
                | RunStatus::Unknown => {}
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Resolve every function call first, then execute them in order.
    ///
    /// Resolution failures abort before any tool runs.
    async fn dispatch_tools(&self, run: &Run, tools: &ToolRegistry) -> Result<Vec<ToolOutput>> {
        let Some(action) = &run.required_action else {
            return Ok(Vec::new());
        };

        let mut resolved: Vec<(String, ToolInvocation)> = Vec::new();
        for call in action.tool_calls() {
            if call.call_type != "function" {
                continue;
            }
            resolved.push((call.id.clone(), tools.resolve(call)?));
        }

        let mut outputs = Vec::with_capacity(resolved.len());
        for (tool_call_id, invocation) in resolved {
            tracing::info!(
                run_id = %run.id,
                tool_id = %tool_call_id,
                tool_name = %invocation.kind().name(),
                "Executing tool call"
            );
            let output = tools.execute(&invocation).await?;
            tracing::debug!(tool_id = %tool_call_id, output = %output, "Tool call result");
            outputs.push(ToolOutput {
                tool_call_id,
                output,
            });
        }

        Ok(outputs)
    }

    async fn completed_outcome(&self, thread_id: &str) -> Result<RunOutcome> {
        let messages = self.api.list_messages(thread_id).await?;
        let text = messages.first().and_then(|m| m.primary_text());

        Ok(RunOutcome {
            message: text.map(|t| t.value.clone()).unwrap_or_default(),
            file_id: text.and_then(|t| t.first_file_id()).map(ToString::to_string),
        })
    }

    async fn failed_outcome(&self, thread_id: &str) -> Result<RunOutcome> {
        match self.failed_policy {
            FailedRunPolicy::Placeholder => Ok(RunOutcome::placeholder(FAILED_MESSAGE)),
            FailedRunPolicy::EchoLastMessage => {
                let messages = self.api.list_messages(thread_id).await?;
                let echoed = messages
                    .first()
                    .and_then(|m| m.primary_text())
                    .map(|t| format!("Failed: {}", t.value));
                Ok(echoed.map_or_else(
                    || RunOutcome::placeholder(FAILED_MESSAGE),
                    |message| RunOutcome {
                        message,
                        file_id: None,
                    },
                ))
            }
        }
    }
}
