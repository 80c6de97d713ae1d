//! Local tools the remote model may call.
//!
//! The set of tools is closed: [`ToolKind`] lists every function this build
//! can answer, and a [`ToolRegistry`] enables a subset of them for one run.
//! A request for anything else is a contract violation and aborts the run.

mod script;

pub use script::ScriptExecutor;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::assistant::ToolCall;
use crate::error::{BridgeError, Result};

/// Every tool kind known to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Execute a file-editing script inside the job working directory.
    FormatFileJob,
}

impl ToolKind {
    /// All tool kinds.
    pub const ALL: [ToolKind; 1] = [ToolKind::FormatFileJob];

    /// Function name the model uses.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FormatFileJob => "format_file_job",
        }
    }

    /// Resolve a function name sent by the model.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Function schema registered on the remote assistant.
    #[must_use]
    pub fn definition(self) -> serde_json::Value {
        match self {
            Self::FormatFileJob => json!({
                "type": "function",
                "function": {
                    "name": self.name(),
                    "description": "ファイルの編集を行うジョブです",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "script": {
                                "type": "string",
                                "description": "ファイル編集の内容が記述されたpythonコードを指定してください",
                            },
                        },
                        "required": ["script"],
                    },
                },
            }),
        }
    }
}

/// A decoded tool call ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    FormatFileJob { script: String },
}

#[derive(Deserialize)]
struct FormatFileJobArgs {
    script: String,
}

impl ToolInvocation {
    /// Decode the JSON arguments for `kind`.
    pub fn decode(kind: ToolKind, arguments: &str) -> Result<Self> {
        match kind {
            ToolKind::FormatFileJob => {
                let args: FormatFileJobArgs =
                    serde_json::from_str(arguments).map_err(|e| BridgeError::ToolArguments {
                        name: kind.name().to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Self::FormatFileJob {
                    script: args.script,
                })
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::FormatFileJob { .. } => ToolKind::FormatFileJob,
        }
    }
}

/// Runs decoded tool invocations.
///
/// Execution failures are reported back to the model as the returned string;
/// they never fail the run.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync + std::fmt::Debug {
    async fn execute(&self, invocation: &ToolInvocation) -> String;
}

/// Tools enabled for one run.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    enabled: Vec<ToolKind>,
    executor: Option<Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    /// A registry that answers no tool calls.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A registry enabling `kinds`, executed by `executor`.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = ToolKind>, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            enabled: kinds.into_iter().collect(),
            executor: Some(executor),
        }
    }

    /// The runner registry: `format_file_job` only.
    #[must_use]
    pub fn runner(executor: Arc<dyn ToolExecutor>) -> Self {
        Self::new([ToolKind::FormatFileJob], executor)
    }

    #[must_use]
    pub fn is_enabled(&self, kind: ToolKind) -> bool {
        self.executor.is_some() && self.enabled.contains(&kind)
    }

    /// Resolve a model tool call to an invocation.
    ///
    /// Fails with [`BridgeError::UnknownTool`] when the name is not a known
    /// kind or is not enabled here.
    pub fn resolve(&self, call: &ToolCall) -> Result<ToolInvocation> {
        let name = &call.function.name;
        let kind = ToolKind::from_name(name)
            .filter(|kind| self.is_enabled(*kind))
            .ok_or_else(|| BridgeError::UnknownTool { name: name.clone() })?;
        ToolInvocation::decode(kind, &call.function.arguments)
    }

    /// Execute a resolved invocation.
    pub async fn execute(&self, invocation: &ToolInvocation) -> Result<String> {
        let kind = invocation.kind();
        match &self.executor {
            Some(executor) if self.enabled.contains(&kind) => Ok(executor.execute(invocation).await),
            _ => Err(BridgeError::UnknownTool {
                name: kind.name().to_string(),
            }),
        }
    }
}
