//! 运算参数 Schema 与决策 JSON 格式
//!
//! OperationSchema 描述一个运算的参数列表（有序、带数值种类与是否必填）；
//! decision_schema_json 用 schemars 生成 oracle 应输出的决策 JSON 结构，注入 system prompt 以减少格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::core::NumericKind;

/// 单个参数声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: NumericKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: NumericKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: NumericKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// 运算参数 Schema：注册后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSchema {
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl OperationSchema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn integer(mut self, name: &str) -> Self {
        self.params.push(ParamSpec::required(name, NumericKind::Integer));
        self
    }

    pub fn real(mut self, name: &str) -> Self {
        self.params.push(ParamSpec::required(name, NumericKind::Real));
        self
    }

    pub fn optional_real(mut self, name: &str) -> Self {
        self.params.push(ParamSpec::optional(name, NumericKind::Real));
        self
    }

    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.required).count()
    }

    /// 参数签名，如 `a: integer, b: integer`
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}: {}", p.name, p.kind)
                } else {
                    format!("{}?: {}", p.name, p.kind)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 参数的 JSON Schema（供 prompt 中的运算列表使用）
    pub fn parameters_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|p| {
                let ty = match p.kind {
                    NumericKind::Integer => "integer",
                    NumericKind::Real => "number",
                };
                (p.name.clone(), serde_json::json!({ "type": ty }))
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}

/// oracle 决策输出格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct DecisionFormat {
    /// 任务名，通常与运算名相同，如 add、multiply
    pub task: String,
    /// 要调用的运算，如 "add" 或 "add(5, 7)"
    pub function_call: Option<String>,
    /// 运算参数，键为参数名，值为数字
    pub function_call_params: Option<HashMap<String, f64>>,
}

/// 返回决策 JSON 的 Schema 字符串，可拼入 system prompt
pub fn decision_schema_json() -> String {
    let schema = schema_for!(DecisionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_marks_optional() {
        let schema = OperationSchema::new("log").real("a").optional_real("base");
        assert_eq!(schema.signature(), "a: real, base?: real");
        assert_eq!(schema.required_count(), 1);
    }

    #[test]
    fn test_parameters_json_lists_required() {
        let schema = OperationSchema::new("add").integer("a").integer("b");
        let json = schema.parameters_json();
        assert_eq!(json["properties"]["a"]["type"], "integer");
        assert_eq!(json["required"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_decision_schema_mentions_fields() {
        let schema = decision_schema_json();
        assert!(schema.contains("function_call_params"));
        assert!(schema.contains("task"));
    }
}
