//! 决策层：把 oracle 的非结构化输出变成可安全执行的规范调用
//!
//! - **extractor**: 原始文本 -> JSON 对象 -> CanonicalDecision
//! - **reconciler**: 任意形状的参数容器 -> schema 声明的规范参数表
//! - **synonyms**: 参数名同义词表（可配置）
//! - **function_call**: `name(args)` 调用字符串解析

pub mod extractor;
pub mod function_call;
pub mod reconciler;
pub mod synonyms;

use serde::{Deserialize, Serialize};

use crate::core::Parameters;

pub use extractor::{parse_json_object, Extractor, DEFAULT_TASK};
pub use function_call::FunctionCall;
pub use reconciler::{RawScalar, Reconciler};
pub use synonyms::{normalize_key, SynonymTable};

/// 规范决策：哪个运算、用哪些参数；parameters 的键均为该运算声明的参数名，值均为数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDecision {
    pub task: String,
    pub operation_name: String,
    pub parameters: Parameters,
}
