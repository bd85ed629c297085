//! 运算分发器
//!
//! 持有 OperationRegistry，dispatch(decision) 先按 schema 重新严格校验参数（不信任任何未经自己校验的决策），
//! 再按 schema 顺序调用实现；实现失败或结果非有限数时转为 ComputationError。每次调用输出结构化审计日志（JSON）。
//! 不触碰记忆与持久化。

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::{CalcError, Number, Parameters};
use crate::decision::CanonicalDecision;
use crate::tools::registry::{Args, OperationRegistry};
use crate::tools::schema::OperationSchema;

/// 分发结果：计算值与实际使用的参数（供写入记忆）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub value: Number,
    pub operation_name: String,
    pub parameters: Parameters,
}

pub struct Dispatcher {
    registry: OperationRegistry,
}

impl Dispatcher {
    pub fn new(registry: OperationRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn dispatch(&self, decision: &CanonicalDecision) -> Result<DispatchResult, CalcError> {
        let name = decision.operation_name.as_str();
        let (implementation, schema) = self.registry.resolve(name)?;
        let (args, parameters) = validate(schema, &decision.parameters)?;

        let start = Instant::now();
        let outcome = implementation.call(&args);
        let result = match outcome {
            Ok(value) if value.is_finite() => Ok(DispatchResult {
                value,
                operation_name: name.to_string(),
                parameters,
            }),
            Ok(value) => Err(CalcError::ComputationError {
                operation: name.to_string(),
                parameters,
                cause: format!("result is not a finite number ({value})"),
            }),
            Err(cause) => Err(CalcError::ComputationError {
                operation: name.to_string(),
                parameters,
                cause,
            }),
        };

        let audit = serde_json::json!({
            "event": "operation_audit",
            "operation": name,
            "ok": result.is_ok(),
            "duration_us": start.elapsed().as_micros() as u64,
            "params_preview": params_preview(&decision.parameters),
        });
        tracing::info!(audit = %audit.to_string(), "operation");

        result
    }
}

/// 严格校验：必填参数存在、值的种类与声明一致；未声明的键丢弃
fn validate(
    schema: &OperationSchema,
    parameters: &Parameters,
) -> Result<(Args, Parameters), CalcError> {
    let mut values = Vec::with_capacity(schema.params.len());
    let mut used = Parameters::new();
    for spec in &schema.params {
        match parameters.get(&spec.name) {
            Some(value) if value.kind() == spec.kind => {
                values.push(Some(*value));
                used.insert(spec.name.clone(), *value);
            }
            Some(_) => {
                return Err(CalcError::TypeMismatch {
                    name: spec.name.clone(),
                    expected: spec.kind,
                })
            }
            None if spec.required => return Err(CalcError::MissingParameter(spec.name.clone())),
            None => values.push(None),
        }
    }
    if used.len() < parameters.len() {
        let dropped: Vec<&String> = parameters.keys().filter(|k| !used.contains_key(*k)).collect();
        tracing::debug!(dropped = ?dropped, "Dropping undeclared parameters");
    }
    Ok((Args::new(values), used))
}

fn params_preview(parameters: &Parameters) -> String {
    let s = serde_json::to_string(parameters).unwrap_or_default();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
