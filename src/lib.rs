//! Opendata Bridge
//!
//! HTTP backend that relays chat turns and script jobs to a hosted
//! Assistants API (Azure `OpenAI` or `OpenAI`) and streams the results back.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server with SSE responses and graceful shutdown
//! - **Assistant**: remote client adapter and the run-poll state machine
//! - **Tools**: closed set of callable tools and their executors
//! - **Sessions**: per-user thread and downloadable file store
//!
//! # Modules
//!
//! - [`assistant`]: remote client, provider handling and run polling
//! - [`tools`]: tool registry and the script executor
//! - [`session`]: per-user session store
//! - [`events`]: records streamed to the client
//! - [`routes`]: HTTP handlers
//! - [`server`]: router assembly and lifecycle

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod assistant;
pub mod config;
pub mod error;
pub mod events;
pub mod routes;
pub mod server;
pub mod session;
pub mod tools;

use std::sync::Arc;

use assistant::{AssistantApi, AssistantSettings, RunPoller};
use config::{AppConfig, RunnerConfig};
use session::SessionStore;

/// Ids of the two remote assistants the routes drive.
#[derive(Debug, Clone)]
pub struct AssistantIds {
    pub chat: String,
    pub runner: String,
}

impl From<&AssistantSettings> for AssistantIds {
    fn from(settings: &AssistantSettings) -> Self {
        Self {
            chat: settings.chat_assistant_id.clone(),
            runner: settings.runner_assistant_id.clone(),
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Remote assistant service.
    pub api: Arc<dyn AssistantApi>,
    /// Per-user sessions.
    pub sessions: SessionStore,
    /// Run driver shared by the chat and runner routes.
    pub poller: Arc<RunPoller>,
    /// Assistant ids.
    pub assistants: AssistantIds,
    /// Runner job settings.
    pub runner: Arc<RunnerConfig>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the session store and poller around `api`.
    pub fn new(api: Arc<dyn AssistantApi>, assistants: AssistantIds, config: Arc<AppConfig>) -> Self {
        let sessions = SessionStore::new(Arc::clone(&api));
        let poller = RunPoller::new(Arc::clone(&api), sessions.clone())
            .with_interval(config.assistant.poll_interval())
            .with_failed_policy(config.assistant.failed_run_policy);

        Self {
            api,
            sessions,
            poller: Arc::new(poller),
            assistants,
            runner: Arc::new(config.runner.clone()),
            config,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("assistants", &self.assistants)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
