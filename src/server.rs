use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::assistant::definitions::{chat_assistant, runner_assistant};
use crate::assistant::{AssistantApi, AssistantClient, AssistantSettings};
use crate::config::AppConfig;
use crate::{AppState, AssistantIds, routes};

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: AssistantSettings) -> anyhow::Result<()> {
    info!(
        name: "assistant.config.loaded",
        endpoint = %settings.endpoint,
        deployment = %settings.deployment_name,
        provider = ?settings.provider,
        "Assistant configuration loaded"
    );

    let assistants = AssistantIds::from(&settings);
    let deployment = settings.deployment_name.clone();
    let api: Arc<dyn AssistantApi> = Arc::new(AssistantClient::new(settings));

    sync_assistants(api.as_ref(), &assistants, &deployment).await;

    tokio::fs::create_dir_all(&config.runner.work_dir).await?;

    let state = AppState::new(api, assistants, Arc::clone(&config));
    let app = build_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        root_path = %config.server.root_path,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let swept = shutdown_sweep(&state).await;
    info!(name: "server.stopped", threads_deleted = swept, "Server stopped");
    Ok(())
}

/// Assemble the router: API routes under `root_path`, plus CORS, tracing
/// and the upload limit.
pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;

    let api = routes::api_router();
    let app = match server.root_path.trim_end_matches('/') {
        "" => Router::new().merge(api),
        prefix => Router::new().nest(prefix, api),
    };

    app.layer(cors_layer(&server.cors_origins))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::mirror_request())
}

/// Push the local assistant definitions to the service. Failures are logged
/// and the server starts anyway with whatever the service already has.
pub async fn sync_assistants(api: &dyn AssistantApi, ids: &AssistantIds, deployment: &str) {
    let definitions = [
        (&ids.chat, chat_assistant(deployment)),
        (&ids.runner, runner_assistant(deployment)),
    ];

    for (id, definition) in definitions {
        match api.update_assistant(id, &definition).await {
            Ok(()) => info!(
                name: "assistant.updated",
                assistant_id = %id,
                assistant = %definition.name,
                "Assistant definition updated"
            ),
            Err(e) => tracing::warn!(
                assistant_id = %id,
                error = %e,
                "Failed to update assistant definition"
            ),
        }
    }
}

/// Delete every remote thread still held by a session. Returns the number
/// deleted; failures are logged and skipped.
pub async fn shutdown_sweep(state: &AppState) -> usize {
    let thread_ids = state.sessions.thread_ids().await;
    let mut deleted = 0;

    for thread_id in thread_ids {
        match state.api.delete_thread(&thread_id).await {
            Ok(()) => {
                info!(thread_id = %thread_id, "Thread deleted");
                deleted += 1;
            }
            Err(e) => tracing::warn!(thread_id = %thread_id, error = %e, "Failed to delete thread"),
        }
    }

    deleted
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(name: "server.shutdown", "Shutdown signal received");
}
