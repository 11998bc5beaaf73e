//! Converts a routed message's result into the user-facing reply text.
//!
//! This is the only place pipeline errors become strings.

use super::executor::ExecutionResult;
use crate::errors::{GenerationError, WorkspaceError};

/// Result of one routing decision, before formatting.
#[derive(Debug)]
pub enum PipelineOutcome {
    Clarification {
        message: String,
    },
    Executed {
        instruction: String,
        file_name: String,
        result: ExecutionResult,
    },
    GenerationFailed(GenerationError),
    PersistFailed(WorkspaceError),
}

pub fn render(outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Clarification { message } => clarification(message),
        PipelineOutcome::Executed {
            instruction,
            file_name,
            result,
        } => execution_summary(instruction, file_name, result),
        PipelineOutcome::GenerationFailed(GenerationError::EmptyCompletion) => {
            "コードを生成できませんでした。指示を再確認してください。".to_string()
        }
        PipelineOutcome::GenerationFailed(GenerationError::UpstreamFailure(cause)) => {
            format!("OpenAI APIの呼び出し中にエラーが発生しました: {}", cause)
        }
        PipelineOutcome::PersistFailed(err) => {
            format!("ファイルの作成中にエラーが発生しました: {}", err)
        }
    }
}

pub fn clarification(message: &str) -> String {
    format!(
        "AIが応答します: 「{}」について、どのような処理をご希望ですか？具体的な指示（例：「『ハローワールド』と表示するPythonスクリプトを作成して」）をいただけると、コードを生成できます。",
        message
    )
}

fn execution_summary(instruction: &str, file_name: &str, result: &ExecutionResult) -> String {
    let mut reply = format!(
        "承知しました。`{}`の指示に基づき、`{}`を作成し、実行しました。\n\n",
        instruction, file_name
    );
    reply.push_str("**実行結果:**\n");
    reply.push_str("```\n");
    if !result.stdout.is_empty() {
        reply.push_str(&format!("--- 標準出力 ---\n{}\n", result.stdout));
    }
    if !result.stderr.is_empty() {
        reply.push_str(&format!("--- エラー出力 ---\n{}\n", result.stderr));
    }
    reply.push_str(&format!("--- 終了コード: {} ---\n", result.exit_code));
    reply.push_str("```");
    reply
}
