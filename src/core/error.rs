//! 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 CalcError 决定 RetryWithPrompt / AskUser / Inform。
//! 所有错误均可恢复，作为返回值交给编排循环，不会跨组件以 panic 形式中止进程。

use thiserror::Error;

use crate::core::number::{NumericKind, Parameters};

/// 抽取、归一化、分发、记忆各环节的统一错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Parameter count mismatch: expected {expected}, got {got}")]
    ParameterCountMismatch { expected: usize, got: usize },

    #[error("Invalid value for parameter '{name}': {value}")]
    InvalidParameterType { name: String, value: String },

    #[error("Parameter '{name}' must be {expected}")]
    TypeMismatch { name: String, expected: NumericKind },

    /// 原始输出中找不到任何 JSON 对象
    #[error("Unparsable oracle response: {0}")]
    UnparsableResponse(String),

    #[error("{operation}({}) failed: {cause}", render_params(.parameters))]
    ComputationError {
        operation: String,
        parameters: Parameters,
        cause: String,
    },

    #[error("Memory persistence failed: {0}")]
    Persistence(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Oracle timeout")]
    OracleTimeout,
}

pub(crate) fn render_params(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让 oracle 重新输出
    RetryWithPrompt(String),
    /// 需要用户澄清（参数缺失、类型不对、未知运算等）
    AskUser(String),
    /// 只需告知用户，请求已结束，不重试也不需要澄清
    Inform(String),
}
