//! Assistant definitions and instruction texts.
//!
//! Both remote assistants are overwritten with these definitions at startup
//! so the deployed configuration always matches this build.

use chrono::{DateTime, Local};
use serde_json::json;

use crate::tools::ToolKind;

use super::AssistantDefinition;

/// Version stamped into chat instructions.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

const CHAT_ASSISTANT_NAME: &str = "Opendata Bridge Chat";
const CHAT_ASSISTANT_INSTRUCTIONS: &str = "You are a specialist in extracting tables from various files such as PDF/Excel/csv and converting them into csv files.";

const RUNNER_ASSISTANT_NAME: &str = "Opendata Bridge Runner";
const RUNNER_ASSISTANT_INSTRUCTIONS: &str =
    "You are an assistant designed to help people answer questions.";

fn code_interpreter() -> serde_json::Value {
    json!({ "type": "code_interpreter" })
}

/// Definition of the table-extraction chat assistant.
#[must_use]
pub fn chat_assistant(model: &str) -> AssistantDefinition {
    AssistantDefinition {
        name: CHAT_ASSISTANT_NAME.to_string(),
        instructions: CHAT_ASSISTANT_INSTRUCTIONS.to_string(),
        tools: vec![code_interpreter()],
        model: model.to_string(),
    }
}

/// Definition of the script runner assistant.
#[must_use]
pub fn runner_assistant(model: &str) -> AssistantDefinition {
    AssistantDefinition {
        name: RUNNER_ASSISTANT_NAME.to_string(),
        instructions: RUNNER_ASSISTANT_INSTRUCTIONS.to_string(),
        tools: vec![code_interpreter(), ToolKind::FormatFileJob.definition()],
        model: model.to_string(),
    }
}

/// Per-run instructions for the chat assistant.
#[must_use]
pub fn chat_instructions(user_id: &str, now: DateTime<Local>) -> String {
    format!(
        "Please address the user as '{user_id}'. \
         Your system version : {TOOL_VERSION}. \
         Be assertive, accurate, and polite. \
         Ask if the user has further questions. \
         Please respond in Japanese except for the user name. \
         Should include the python code you executed in your response. \
         The current date and time is: {}. ",
        now.format("%x %X")
    )
}

/// Prompt asking the runner assistant to review and execute `script`
/// against the uploaded copy named `filename`.
#[must_use]
pub fn runner_prompt(filename: &str, script: &str) -> String {
    format!(
        r"
あなたはpandasなどのツールでデータの編集を行うpythonコードと編集対象のファイルを受け取りました。
それらを使って以下のタスクを実行してください。回答内容には各ステップの実行結果を表示してください。
各ステップの実行でユーザの確認は絶対にしないでください。構わず次々と実行してください。
作業方針の確認も不要です。全てのタスクを実行してください。

# タスク
(1)
サーバの情報にアクセスするようなコードが存在しないかチェックしてください。

(2)
受け取ったファイル編集用のコードにファイルの入出力に関するコードがあれば、
入力ファイル名及び出力ファイル名を{filename}に変更してください。
pandasのto_csvの引数にはindex=Noneを指定してください。
それ以外のコードは絶対に変更してはいけません。
ファイルパスは絶対に指定してはいけません。例えば、/mnt/data/{filename}のような指定は絶対にしてはいけません。

(3)
{tool}でファイル編集を実行してください。
このフェーズは必ず実行してください。

(4)
ファイル編集が終わったら、これまでのタスクの実行結果全てを表示してください。
===
{script}
",
        tool = ToolKind::FormatFileJob.name(),
    )
}
