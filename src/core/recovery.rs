//! 错误恢复引擎
//!
//! 根据 CalcError 类型返回 RecoveryAction，供编排循环决定是重新询问 oracle、请用户澄清还是只告知结果。
//! 核心各组件本身从不重试；重试策略只在这里和编排循环中存在。

use crate::core::{CalcError, NumericKind, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作（重试提示 / 问用户 / 告知）
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &CalcError) -> RecoveryAction {
        match err {
            CalcError::UnparsableResponse(raw) => RecoveryAction::RetryWithPrompt(format!(
                "The previous reply could not be parsed as JSON: {}. \
                Reply with exactly one JSON object and nothing else, for example: \
                {{\"task\": \"add\", \"function_call\": \"add\", \"function_call_params\": {{\"a\": 5, \"b\": 7}}}}",
                preview(raw)
            )),
            CalcError::Oracle(_) | CalcError::OracleTimeout => {
                RecoveryAction::RetryWithPrompt("Please answer the previous request again.".to_string())
            }
            CalcError::UnknownOperation(name) => RecoveryAction::AskUser(format!(
                "I can't perform '{name}'. Which of the supported operations did you mean?"
            )),
            CalcError::MissingParameter(name) => {
                RecoveryAction::AskUser(format!("What value should I use for '{name}'?"))
            }
            CalcError::ParameterCountMismatch { expected, got } => RecoveryAction::AskUser(format!(
                "That operation takes {expected} number(s), but I found {got}. Could you restate it?"
            )),
            CalcError::InvalidParameterType { name, value } => RecoveryAction::AskUser(format!(
                "'{value}' is not a number I can use for '{name}'. Could you give it in digits?"
            )),
            CalcError::TypeMismatch { name, expected } => {
                let kind = match expected {
                    NumericKind::Integer => "a whole number",
                    NumericKind::Real => "a real number",
                };
                RecoveryAction::AskUser(format!("'{name}' must be {kind}."))
            }
            CalcError::ComputationError { operation, cause, .. } => {
                RecoveryAction::AskUser(format!("{operation} can't be computed: {cause}."))
            }
            CalcError::Persistence(cause) => RecoveryAction::Inform(format!(
                "The result could not be saved to memory ({cause}); it will be recomputed next time."
            )),
        }
    }
}

fn preview(raw: &str) -> String {
    if raw.chars().count() > 120 {
        format!("{}...", raw.chars().take(120).collect::<String>())
    } else {
        raw.to_string()
    }
}
