//! `format_file_job` executor: runs model-supplied script text.
//!
//! The script runs with the privileges of the server process. There is no
//! sandbox and no resource limit; the only containment is the job working
//! directory used as the child's cwd.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use super::{ToolExecutor, ToolInvocation};

/// Output reported to the model when the script exits successfully.
pub const SCRIPT_SUCCEEDED: &str = "コードの実行に成功しました。";

/// Prefix of the output reported to the model when the script fails.
pub const SCRIPT_FAILED: &str = "コードの実行に失敗しました。Error: ";

/// Executes scripts through an interpreter child process.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    interpreter: String,
    work_dir: PathBuf,
}

impl ScriptExecutor {
    /// Create an executor running `<interpreter> -c <script>` inside `work_dir`.
    #[must_use]
    pub fn new(interpreter: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            work_dir: work_dir.into(),
        }
    }

    async fn run_script(&self, script: &str) -> String {
        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(script)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                tracing::info!(
                    interpreter = %self.interpreter,
                    stdout_length = out.stdout.len(),
                    "Script succeeded"
                );
                SCRIPT_SUCCEEDED.to_string()
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                let detail = if stderr.is_empty() {
                    format!("exit status {}", out.status)
                } else {
                    stderr
                };
                tracing::error!(interpreter = %self.interpreter, error = %detail, "Script failed");
                format!("{SCRIPT_FAILED}{detail}")
            }
            Err(e) => {
                tracing::error!(interpreter = %self.interpreter, error = %e, "Failed to spawn script");
                format!("{SCRIPT_FAILED}{e}")
            }
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ScriptExecutor {
    async fn execute(&self, invocation: &ToolInvocation) -> String {
        match invocation {
            ToolInvocation::FormatFileJob { script } => self.run_script(script).await,
        }
    }
}
