//! 运算注册表
//!
//! 所有运算实现 Operation trait（接收按 schema 顺序排列的参数，返回 Number），由 OperationRegistry
//! 按名注册与查找；Dispatcher 在调用前按 schema 严格校验参数并统一转 CalcError。

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{CalcError, Number};
use crate::tools::schema::OperationSchema;

/// 已校验的调用参数，按 schema 声明顺序排列；可选参数缺省时为 None
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    values: Vec<Option<Number>>,
}

impl Args {
    pub fn new(values: Vec<Option<Number>>) -> Self {
        Self { values }
    }

    pub fn int(&self, idx: usize) -> Result<i64, String> {
        match self.values.get(idx).copied().flatten() {
            Some(Number::Int(v)) => Ok(v),
            Some(Number::Real(v)) => Err(format!("argument {idx} is not an integer: {v}")),
            None => Err(format!("argument {idx} is missing")),
        }
    }

    pub fn real(&self, idx: usize) -> Result<f64, String> {
        self.values
            .get(idx)
            .copied()
            .flatten()
            .map(|n| n.as_f64())
            .ok_or_else(|| format!("argument {idx} is missing"))
    }

    pub fn opt_real(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().flatten().map(|n| n.as_f64())
    }
}

/// 运算 trait：数值边界（除零、负数开方等）由实现自行返回 Err(原因)，不得 panic
pub trait Operation: Send + Sync {
    fn call(&self, args: &Args) -> Result<Number, String>;
}

impl<F> Operation for F
where
    F: Fn(&Args) -> Result<Number, String> + Send + Sync,
{
    fn call(&self, args: &Args) -> Result<Number, String> {
        self(args)
    }
}

/// 注册表中的一条绑定：名称 + 实现 + 参数 schema
#[derive(Clone)]
pub struct OperationBinding {
    pub name: String,
    pub implementation: Arc<dyn Operation>,
    pub schema: OperationSchema,
}

/// 运算注册表：按名称存储绑定，支持 register / resolve / operation_names / describe
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, OperationBinding>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加或替换一个运算绑定
    pub fn register(
        &mut self,
        name: impl Into<String>,
        implementation: impl Operation + 'static,
        schema: OperationSchema,
    ) {
        let name = name.into();
        let binding = OperationBinding {
            name: name.clone(),
            implementation: Arc::new(implementation),
            schema,
        };
        if self.operations.insert(name.clone(), binding).is_some() {
            tracing::debug!("Operation '{}' re-registered, previous binding replaced", name);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<(Arc<dyn Operation>, &OperationSchema), CalcError> {
        self.operations
            .get(name)
            .map(|b| (b.implementation.clone(), &b.schema))
            .ok_or_else(|| CalcError::UnknownOperation(name.to_string()))
    }

    pub fn schema(&self, name: &str) -> Result<&OperationSchema, CalcError> {
        self.operations
            .get(name)
            .map(|b| &b.schema)
            .ok_or_else(|| CalcError::UnknownOperation(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// 按名称排序的运算名列表
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// 每个运算一行 `name(a: integer, b: integer) - description`，用于生成 prompt 中的运算列表
    pub fn describe(&self) -> String {
        self.operation_names()
            .iter()
            .filter_map(|name| self.operations.get(name))
            .enumerate()
            .map(|(i, b)| {
                format!(
                    "{}. {}({}) - {}",
                    i + 1,
                    b.name,
                    b.schema.signature(),
                    b.schema.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 运算列表的 JSON（name / description / parameters）
    pub fn to_schema_json(&self) -> String {
        let operations: Vec<serde_json::Value> = self
            .operation_names()
            .iter()
            .filter_map(|name| self.operations.get(name))
            .map(|b| {
                serde_json::json!({
                    "name": b.name,
                    "description": b.schema.description,
                    "parameters": b.schema.parameters_json()
                })
            })
            .collect();
        serde_json::to_string_pretty(&operations).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negate(args: &Args) -> Result<Number, String> {
        Ok(Number::Int(-args.int(0)?))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = OperationRegistry::new();
        registry.register("negate", negate, OperationSchema::new("Negate").integer("a"));

        let (op, schema) = registry.resolve("negate").unwrap();
        assert_eq!(schema.params.len(), 1);
        assert_eq!(op.call(&Args::new(vec![Some(Number::Int(4))])), Ok(Number::Int(-4)));
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = OperationRegistry::new();
        assert_eq!(
            registry.resolve("nope").err(),
            Some(CalcError::UnknownOperation("nope".to_string()))
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = OperationRegistry::new();
        registry.register("f", negate, OperationSchema::new("first").integer("a"));
        registry.register(
            "f",
            |_: &Args| -> Result<Number, String> { Ok(Number::Int(0)) },
            OperationSchema::new("second").integer("a").integer("b"),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.schema("f").unwrap().description, "second");
    }

    #[test]
    fn test_describe_sorted() {
        let mut registry = OperationRegistry::new();
        registry.register("zeta", negate, OperationSchema::new("Z").integer("a"));
        registry.register("alpha", negate, OperationSchema::new("A").integer("a"));
        let text = registry.describe();
        assert_eq!(text, "1. alpha(a: integer) - A\n2. zeta(a: integer) - Z");
    }

    #[test]
    fn test_args_accessors() {
        let args = Args::new(vec![Some(Number::Int(3)), Some(Number::Real(1.5)), None]);
        assert_eq!(args.int(0), Ok(3));
        assert!(args.int(1).is_err());
        assert_eq!(args.real(0), Ok(3.0));
        assert_eq!(args.opt_real(2), None);
        assert!(args.real(5).is_err());
    }
}
