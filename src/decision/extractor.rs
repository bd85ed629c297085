//! 结构化输出抽取（Extractor）
//!
//! oracle 的原始回复 -> CanonicalDecision：先整体严格解析 JSON，失败则按括号配对找 `{...}` 片段重试；
//! 然后确定运算名（只容忍字段名的模糊，不容忍运算之间的模糊），再把参数交给 Reconciler。

use serde_json::{Map, Value};

use crate::core::CalcError;
use crate::decision::function_call::FunctionCall;
use crate::decision::reconciler::Reconciler;
use crate::decision::CanonicalDecision;
use crate::tools::OperationRegistry;

/// 缺少 task 字段时的默认任务名
pub const DEFAULT_TASK: &str = "unknown_operation";

/// 显式运算名字段，按优先级
const OPERATION_KEYS: &[&str] = &["operation_name", "operation", "function_name", "function", "tool"];

/// 结构化参数字段，按优先级
const PARAMETER_KEYS: &[&str] = &[
    "function_call_params",
    "parameters",
    "params",
    "arguments",
    "args",
    "input",
];

/// 从原始文本中取出第一个可解析的 JSON 对象
///
/// 1. 整段严格解析；若整段是一个 JSON 字符串且其内容是对象，解开一层
/// 2. 依次尝试每个括号配对的 `{...}` 片段（忽略字符串字面量内的括号）
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>, CalcError> {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(Value::String(inner)) => {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(inner.trim()) {
                return Ok(map);
            }
        }
        _ => {}
    }

    for span in balanced_objects(trimmed) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span) {
            return Ok(map);
        }
    }
    Err(CalcError::UnparsableResponse(raw.to_string()))
}

/// 括号配对的 `{...}` 片段，按起始位置排序；每个 `{` 都作为候选起点，
/// 前文中未闭合的 `{` 不会遮住后面完整的对象
pub fn balanced_objects(text: &str) -> Vec<&str> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .filter_map(|(start, _)| matching_close(text, start).map(|end| &text[start..=end]))
        .collect()
}

/// 从 start 处的 `{` 向后找与之配对的 `}`（忽略字符串字面量内的括号）
fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// 决策抽取器：借用注册表（校验运算名）与 Reconciler（归一化参数）
pub struct Extractor<'a> {
    registry: &'a OperationRegistry,
    reconciler: &'a Reconciler,
}

impl<'a> Extractor<'a> {
    pub fn new(registry: &'a OperationRegistry, reconciler: &'a Reconciler) -> Self {
        Self {
            registry,
            reconciler,
        }
    }

    /// 原始 oracle 文本 -> CanonicalDecision
    pub fn extract(&self, raw: &str) -> Result<CanonicalDecision, CalcError> {
        let object = parse_json_object(raw)?;
        self.extract_object(&object)
    }

    fn extract_object(&self, object: &Map<String, Value>) -> Result<CanonicalDecision, CalcError> {
        let task = read_task(object);
        let call = read_function_call(object);

        let operation_name = resolve_operation_name(object, call.as_ref(), &task)
            .ok_or_else(|| CalcError::UnknownOperation(task.clone()))?;
        let schema = self.registry.schema(&operation_name)?;

        let source = PARAMETER_KEYS
            .iter()
            .filter_map(|k| object.get(*k))
            .find(|v| !is_empty_container(v))
            .cloned()
            .or_else(|| call.as_ref().and_then(|c| c.args.clone()));

        tracing::debug!(
            task = %task,
            operation = %operation_name,
            has_params = source.is_some(),
            "Extracted decision"
        );

        let parameters = self.reconciler.reconcile(source.as_ref(), schema)?;
        Ok(CanonicalDecision {
            task,
            operation_name,
            parameters,
        })
    }
}

fn read_task(object: &Map<String, Value>) -> String {
    match object.get("task") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => DEFAULT_TASK.to_string(),
    }
}

/// function_call 可为 `name(args)` 字符串，或 `{"name": ..., "arguments": ...}` 对象
fn read_function_call(object: &Map<String, Value>) -> Option<FunctionCall> {
    match object.get("function_call")? {
        Value::String(s) => FunctionCall::parse(s),
        Value::Object(o) => {
            let name = o.get("name").and_then(Value::as_str)?;
            let mut call = FunctionCall::parse(name)?;
            if let Some(args) = o.get("arguments").filter(|v| !is_empty_container(v)) {
                call.args = Some(args.clone());
            }
            Some(call)
        }
        _ => None,
    }
}

/// 运算名：显式字段 -> function_call 名称 -> task
fn resolve_operation_name(
    object: &Map<String, Value>,
    call: Option<&FunctionCall>,
    task: &str,
) -> Option<String> {
    let explicit = OPERATION_KEYS
        .iter()
        .filter_map(|k| object.get(*k).and_then(Value::as_str))
        .find_map(normalize_operation_name);
    explicit
        .or_else(|| call.map(|c| c.name.clone()))
        .or_else(|| {
            if task == DEFAULT_TASK {
                None
            } else {
                normalize_operation_name(task)
            }
        })
}

fn normalize_operation_name(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        FunctionCall::parse(trimmed)
            .map(|c| c.name)
            .unwrap_or_else(|| trimmed.to_lowercase()),
    )
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
