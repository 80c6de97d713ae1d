//! Server configuration.
//!
//! Settings are layered, lowest priority first: built-in defaults, an
//! optional config file, `BRIDGE_`-prefixed environment variables
//! (`BRIDGE_SERVER__PORT=8000`), then CLI flags. Credentials for the
//! assistant service come from their own environment variables, see
//! [`load_assistant_settings`].

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::assistant::{AssistantSettings, FailedRunPolicy, Provider};
use crate::error::{BridgeError, Result};

/// Environment variable holding the service endpoint.
pub const ENV_ENDPOINT: &str = "OPENAI_URI";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "OPENAI_KEY";
/// Environment variable holding the API version.
pub const ENV_API_VERSION: &str = "OPENAI_VERSION";
/// Environment variable holding the deployment (model) name.
pub const ENV_DEPLOYMENT: &str = "OPENAI_GPT_DEPLOYMENT";
/// Environment variable holding the chat assistant id.
pub const ENV_CHAT_ASSISTANT_ID: &str = "OPENDATA_BRIDGE_CHAT_ASSISTANT_ID";
/// Environment variable holding the runner assistant id.
pub const ENV_RUNNER_ASSISTANT_ID: &str = "OPENDATA_BRIDGE_RUNNER_ASSISTANT_ID";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Seconds between run status polls
    #[arg(long, env = "POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub assistant: AssistantConfig,
    pub runner: RunnerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every route is nested under.
    pub root_path: String,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    pub poll_interval_secs: u64,
    pub failed_run_policy: FailedRunPolicy,
}

impl AssistantConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Directory holding uploaded copies while a runner job executes.
    pub work_dir: PathBuf,
    /// Interpreter invoked as `<interpreter> -c <script>`.
    pub interpreter: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> std::result::Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.root_path", "/api")?
            .set_default("server.cors_origins", vec!["http://localhost:3000"])?
            .set_default("server.max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("assistant.poll_interval_secs", 5)?
            .set_default("assistant.failed_run_policy", "placeholder")?
            .set_default(
                "runner.work_dir",
                std::env::temp_dir()
                    .join("opendata-bridge")
                    .to_string_lossy()
                    .to_string(),
            )?
            .set_default("runner.interpreter", "python3")?
            .set_default("log.json", false)?;

        // An explicit file must exist; the cwd fallback is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("BRIDGE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", u64::from(port))?;
        }
        if let Some(secs) = cli.poll_interval_secs {
            builder = builder.set_override("assistant.poll_interval_secs", secs)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("log.json", json)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

/// Load assistant service settings from the process environment.
pub fn load_assistant_settings() -> Result<AssistantSettings> {
    assistant_settings_from(|key| std::env::var(key).ok())
}

/// Build assistant settings from a variable lookup.
pub fn assistant_settings_from<F>(lookup: F) -> Result<AssistantSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| -> Result<String> {
        let value = lookup(key)
            .ok_or_else(|| BridgeError::Config(format!("Missing required env var: {key}")))?;
        if value.trim().is_empty() {
            return Err(BridgeError::Config(format!("{key} cannot be empty")));
        }
        Ok(value)
    };

    let endpoint = required(ENV_ENDPOINT)?;
    Url::parse(&endpoint)
        .map_err(|e| BridgeError::Config(format!("{ENV_ENDPOINT} is not a valid URL: {e}")))?;

    let api_key = required(ENV_API_KEY)?;
    let deployment_name = required(ENV_DEPLOYMENT)?;
    let chat_assistant_id = required(ENV_CHAT_ASSISTANT_ID)?;
    let runner_assistant_id = required(ENV_RUNNER_ASSISTANT_ID)?;
    let api_version = lookup(ENV_API_VERSION).unwrap_or_default();

    let provider = Provider::detect_from_url(&endpoint, &api_version);

    Ok(AssistantSettings {
        endpoint,
        api_key,
        api_version,
        deployment_name,
        chat_assistant_id,
        runner_assistant_id,
        provider,
    })
}
