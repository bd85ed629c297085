//! 参数归一化（Reconciler）
//!
//! 把任意形状的参数容器（对象 / 数组 / 内嵌 JSON 字符串 / 调用字符串参数）映射为 schema 声明的
//! 规范参数表。这里是唯一把「可能是数字的任何东西」收窄为 Number 的地方。
//!
//! 对象的匹配顺序：精确参数名 -> 归一化参数名 -> 同义词表 -> 位置回退（无任何名称命中且条目数相等时）。

use serde_json::{Map, Value};

use crate::core::{CalcError, Number, NumericKind, Parameters};
use crate::decision::function_call::parse_args;
use crate::decision::synonyms::{normalize_key, SynonymTable};
use crate::tools::schema::{OperationSchema, ParamSpec};

/// i64 可表示的浮点范围 [-2^63, 2^63)
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// 归一化之前的参数值：字符串 / 整数 / 浮点 / 其它（bool、对象、数组）
#[derive(Debug, Clone, PartialEq)]
pub enum RawScalar {
    Text(String),
    Integer(i64),
    Real(f64),
    Other(String),
}

impl RawScalar {
    /// null 视为缺省，返回 None
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(RawScalar::Text(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => RawScalar::Integer(i),
                None => RawScalar::Real(n.as_f64().unwrap_or(f64::NAN)),
            }),
            other => Some(RawScalar::Other(other.to_string())),
        }
    }

    fn render(&self) -> String {
        match self {
            RawScalar::Text(s) | RawScalar::Other(s) => s.clone(),
            RawScalar::Integer(i) => i.to_string(),
            RawScalar::Real(f) => f.to_string(),
        }
    }
}

/// 参数归一化器：持有同义词表，无其它状态；相同输入与 schema 总得到相同结果
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    synonyms: SynonymTable,
}

impl Reconciler {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    /// 归一化参数容器；raw 为 None 表示没有任何参数来源
    pub fn reconcile(
        &self,
        raw: Option<&Value>,
        schema: &OperationSchema,
    ) -> Result<Parameters, CalcError> {
        let slots = self.assign(raw, schema)?;
        finish(slots, schema)
    }

    /// 从调用字符串的括号参数（如 `5, 7` 或 `a=5, b=7`）归一化
    pub fn reconcile_call_args(
        &self,
        inner: &str,
        schema: &OperationSchema,
    ) -> Result<Parameters, CalcError> {
        let args = parse_args(inner);
        self.reconcile(args.as_ref(), schema)
    }

    /// 把容器中的值分配到 schema 的各个参数槽位
    fn assign(
        &self,
        raw: Option<&Value>,
        schema: &OperationSchema,
    ) -> Result<Vec<Option<RawScalar>>, CalcError> {
        let empty = || vec![None; schema.params.len()];
        match raw {
            None | Some(Value::Null) => Ok(empty()),
            Some(Value::Object(map)) if map.is_empty() => Ok(empty()),
            Some(Value::Array(items)) if items.is_empty() => Ok(empty()),
            Some(Value::Object(map)) => self.assign_mapping(map, schema),
            Some(Value::Array(items)) => assign_sequence(items, schema),
            Some(Value::String(s)) => match parse_embedded(s) {
                Some(inner) => self.assign(Some(&inner), schema),
                None => match parse_args(s) {
                    Some(args) => self.assign(Some(&args), schema),
                    None => Ok(empty()),
                },
            },
            Some(scalar) => assign_sequence(std::slice::from_ref(scalar), schema),
        }
    }

    fn assign_mapping(
        &self,
        map: &Map<String, Value>,
        schema: &OperationSchema,
    ) -> Result<Vec<Option<RawScalar>>, CalcError> {
        if let Some(inner) = self.unwrap_wrapper(map, schema) {
            return self.assign(Some(&inner), schema);
        }

        let params = &schema.params;
        let mut slots: Vec<Option<RawScalar>> = vec![None; params.len()];
        let mut filled = vec![false; params.len()];
        let mut used = vec![false; map.len()];
        let entries: Vec<(&String, &Value)> = map.iter().collect();

        let declared: Vec<String> = params.iter().map(|p| normalize_key(&p.name)).collect();

        // 1. 精确参数名；值为 null 的键算作已用，但不占住槽位，后续阶段仍可填充
        for (idx, spec) in params.iter().enumerate() {
            if let Some(pos) = entries.iter().position(|(k, _)| k.as_str() == spec.name) {
                used[pos] = true;
                slots[idx] = RawScalar::from_value(entries[pos].1);
                filled[idx] = slots[idx].is_some();
            }
        }

        // 2. 归一化参数名（大小写、下划线、空白不敏感）
        for idx in 0..params.len() {
            if filled[idx] {
                continue;
            }
            let hit = entries
                .iter()
                .enumerate()
                .find(|(pos, (k, _))| !used[*pos] && normalize_key(k) == declared[idx])
                .map(|(pos, _)| pos);
            if let Some(pos) = hit {
                used[pos] = true;
                slots[idx] = RawScalar::from_value(entries[pos].1);
                filled[idx] = slots[idx].is_some();
            }
        }

        // 3. 同义词；与任一声明名同名的键不参与
        for idx in 0..params.len() {
            if filled[idx] {
                continue;
            }
            let hit = entries
                .iter()
                .enumerate()
                .find(|(pos, (k, _))| {
                    !used[*pos]
                        && !declared.contains(&normalize_key(k))
                        && self.synonyms.position(k) == Some(idx)
                })
                .map(|(pos, _)| pos);
            if let Some(pos) = hit {
                used[pos] = true;
                slots[idx] = RawScalar::from_value(entries[pos].1);
                filled[idx] = slots[idx].is_some();
            }
        }

        // 4. 位置回退：没有任何键按名称命中，且条目数与声明参数数相同
        if !used.iter().any(|u| *u) && entries.len() == params.len() {
            tracing::debug!("No parameter names matched, assigning {} values by position", entries.len());
            return Ok(entries
                .iter()
                .map(|(_, v)| RawScalar::from_value(v))
                .collect());
        }

        let ignored: Vec<&str> = entries
            .iter()
            .enumerate()
            .filter(|(pos, _)| !used[*pos])
            .map(|(_, (k, _))| k.as_str())
            .collect();
        if !ignored.is_empty() {
            tracing::debug!(ignored = ?ignored, "Ignoring undeclared parameter keys");
        }
        Ok(slots)
    }

    /// `{"input": {...}}` 之类的单键包装：键不是任何参数名或同义词，值是容器或内嵌 JSON
    fn unwrap_wrapper(&self, map: &Map<String, Value>, schema: &OperationSchema) -> Option<Value> {
        if map.len() != 1 {
            return None;
        }
        let (key, value) = map.iter().next()?;
        let normalized = normalize_key(key);
        let names_param = schema
            .params
            .iter()
            .any(|p| normalize_key(&p.name) == normalized)
            || self.synonyms.position(key).is_some();
        if names_param {
            return None;
        }
        match value {
            Value::Object(_) | Value::Array(_) => Some(value.clone()),
            Value::String(s) => parse_embedded(s),
            _ => None,
        }
    }
}

/// 字符串内嵌的 JSON 对象或数组
fn parse_embedded(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        _ => None,
    }
}

fn assign_sequence(
    items: &[Value],
    schema: &OperationSchema,
) -> Result<Vec<Option<RawScalar>>, CalcError> {
    let declared = schema.params.len();
    let required = schema.required_count();
    if items.len() < required {
        return Err(CalcError::ParameterCountMismatch {
            expected: required,
            got: items.len(),
        });
    }
    if items.len() > declared {
        return Err(CalcError::ParameterCountMismatch {
            expected: declared,
            got: items.len(),
        });
    }
    let mut slots: Vec<Option<RawScalar>> = items.iter().map(RawScalar::from_value).collect();
    slots.resize(declared, None);
    Ok(slots)
}

/// 收窄每个槽位的值，再检查必填参数
fn finish(slots: Vec<Option<RawScalar>>, schema: &OperationSchema) -> Result<Parameters, CalcError> {
    let mut parameters = Parameters::new();
    for (spec, slot) in schema.params.iter().zip(slots) {
        if let Some(raw) = slot {
            parameters.insert(spec.name.clone(), narrow(spec, raw)?);
        }
    }
    if let Some(missing) = schema
        .params
        .iter()
        .find(|p| p.required && !parameters.contains_key(&p.name))
    {
        return Err(CalcError::MissingParameter(missing.name.clone()));
    }
    Ok(parameters)
}

/// RawScalar -> 声明种类的 Number
pub fn narrow(spec: &ParamSpec, raw: RawScalar) -> Result<Number, CalcError> {
    let invalid = |raw: &RawScalar| CalcError::InvalidParameterType {
        name: spec.name.clone(),
        value: raw.render(),
    };
    let numeric = match &raw {
        RawScalar::Integer(i) => RawScalar::Integer(*i),
        RawScalar::Real(f) if f.is_finite() => RawScalar::Real(*f),
        RawScalar::Text(s) => parse_numeric_text(s, spec.kind).ok_or_else(|| invalid(&raw))?,
        RawScalar::Real(_) | RawScalar::Other(_) => return Err(invalid(&raw)),
    };
    match (spec.kind, numeric) {
        (NumericKind::Integer, RawScalar::Integer(i)) => Ok(Number::Int(i)),
        (NumericKind::Integer, RawScalar::Real(f)) => {
            if f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&f) {
                Ok(Number::Int(f as i64))
            } else {
                Err(CalcError::TypeMismatch {
                    name: spec.name.clone(),
                    expected: NumericKind::Integer,
                })
            }
        }
        (NumericKind::Real, RawScalar::Integer(i)) => Ok(Number::Real(i as f64)),
        (NumericKind::Real, RawScalar::Real(f)) => Ok(Number::Real(f)),
        (_, other) => Err(invalid(&other)),
    }
}

/// 数字字符串：去空白与引号后按 i64、再按有限 f64 解析；
/// 整数参数的纯整数字面量超出 i64 时不退回浮点（否则会被舍入成另一个值）
fn parse_numeric_text(s: &str, kind: NumericKind) -> Option<RawScalar> {
    let t = s.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let t = t.strip_prefix('+').unwrap_or(t);
    if let Ok(i) = t.parse::<i64>() {
        return Some(RawScalar::Integer(i));
    }
    let digits = t.strip_prefix('-').unwrap_or(t);
    if kind == NumericKind::Integer
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(RawScalar::Real(f)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_schema() -> OperationSchema {
        OperationSchema::new("Add two numbers").integer("a").integer("b")
    }

    fn ab(a: i64, b: i64) -> Parameters {
        let mut p = Parameters::new();
        p.insert("a".to_string(), Number::Int(a));
        p.insert("b".to_string(), Number::Int(b));
        p
    }

    fn reconcile(raw: Value, schema: &OperationSchema) -> Result<Parameters, CalcError> {
        Reconciler::default().reconcile(Some(&raw), schema)
    }

    #[test]
    fn test_naming_variants_agree() {
        let schema = add_schema();
        let variants = [
            json!({"a": 5, "b": 7}),
            json!({"param1": 5, "param2": 7}),
            json!({"integer1": "5", "integer2": "7"}),
            json!({"num_1": 5, "Num 2": 7.0}),
            json!({"first": 5, "second": 7}),
            json!({"A": 5, "B": 7}),
            json!([5, 7]),
            json!(["5", "7"]),
            json!({"foo": 5, "bar": 7}),
            json!({"input": {"a": 5, "b": 7}}),
            json!("{\"a\": 5, \"b\": 7}"),
            json!("5, 7"),
        ];
        for raw in variants {
            assert_eq!(reconcile(raw.clone(), &schema), Ok(ab(5, 7)), "variant {raw}");
        }
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let schema = add_schema();
        let once = reconcile(json!({"param1": "5", "param2": 7}), &schema).unwrap();
        let as_json = serde_json::to_value(&once).unwrap();
        let twice = reconcile(as_json, &schema).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_exact_name_beats_synonym() {
        let schema = OperationSchema::new("log").real("a").optional_real("base");
        let out = reconcile(json!({"base": 2, "number": 8}), &schema).unwrap();
        assert_eq!(out.get("a"), Some(&Number::Real(8.0)));
        assert_eq!(out.get("base"), Some(&Number::Real(2.0)));
    }

    #[test]
    fn test_positional_fallback_requires_matching_count() {
        let schema = add_schema();
        assert_eq!(
            reconcile(json!({"foo": 5}), &schema),
            Err(CalcError::MissingParameter("a".to_string()))
        );
        assert_eq!(
            reconcile(json!({"foo": 5, "bar": 7, "baz": 9}), &schema),
            Err(CalcError::MissingParameter("a".to_string()))
        );
    }

    #[test]
    fn test_positional_fallback_follows_insertion_order() {
        let schema = add_schema();
        assert_eq!(reconcile(json!({"zz": 2, "aa": 5}), &schema), Ok(ab(2, 5)));
    }

    #[test]
    fn test_sequence_length_mismatch() {
        let schema = add_schema();
        assert_eq!(
            reconcile(json!([5]), &schema),
            Err(CalcError::ParameterCountMismatch { expected: 2, got: 1 })
        );
        assert_eq!(
            reconcile(json!([1, 2, 3]), &schema),
            Err(CalcError::ParameterCountMismatch { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_optional_parameter_may_be_omitted() {
        let schema = OperationSchema::new("log").real("a").optional_real("base");
        let out = reconcile(json!([8]), &schema).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("a"), Some(&Number::Real(8.0)));
    }

    #[test]
    fn test_invalid_string() {
        assert_eq!(
            reconcile(json!({"a": 5, "b": "seven"}), &add_schema()),
            Err(CalcError::InvalidParameterType {
                name: "b".to_string(),
                value: "seven".to_string(),
            })
        );
    }

    #[test]
    fn test_fractional_value_for_integer() {
        let err = reconcile(json!({"a": 2.5, "b": 1}), &add_schema());
        assert_eq!(
            err,
            Err(CalcError::TypeMismatch {
                name: "a".to_string(),
                expected: NumericKind::Integer,
            })
        );
        assert_eq!(reconcile(json!({"a": "4.0", "b": 1.0}), &add_schema()), Ok(ab(4, 1)));
    }

    #[test]
    fn test_non_numeric_kinds_rejected() {
        let schema = add_schema();
        assert!(matches!(
            reconcile(json!({"a": true, "b": 1}), &schema),
            Err(CalcError::InvalidParameterType { .. })
        ));
        assert!(matches!(
            reconcile(json!({"a": "NaN", "b": 1}), &schema),
            Err(CalcError::InvalidParameterType { .. })
        ));
        assert!(matches!(
            reconcile(json!({"a": [1], "b": 1}), &schema),
            Err(CalcError::InvalidParameterType { .. })
        ));
    }

    #[test]
    fn test_integer_widens_to_real() {
        let schema = OperationSchema::new("sqrt").real("a");
        let out = reconcile(json!({"a": 16}), &schema).unwrap();
        assert_eq!(out.get("a"), Some(&Number::Real(16.0)));
    }

    #[test]
    fn test_missing_and_null() {
        let schema = add_schema();
        assert_eq!(
            reconcile(json!({"a": 5, "b": null}), &schema),
            Err(CalcError::MissingParameter("b".to_string()))
        );
        assert_eq!(
            Reconciler::default().reconcile(None, &schema),
            Err(CalcError::MissingParameter("a".to_string()))
        );
    }

    #[test]
    fn test_null_declared_name_leaves_slot_open() {
        let schema = add_schema();
        assert_eq!(reconcile(json!({"a": null, "param1": 5, "b": 7}), &schema), Ok(ab(5, 7)));
        assert_eq!(
            reconcile(json!({"a": null, "foo": 5}), &schema),
            Err(CalcError::MissingParameter("a".to_string()))
        );
    }

    #[test]
    fn test_call_args() {
        let reconciler = Reconciler::default();
        let schema = add_schema();
        assert_eq!(reconciler.reconcile_call_args("3, 4", &schema), Ok(ab(3, 4)));
        assert_eq!(reconciler.reconcile_call_args("b=4, a=3", &schema), Ok(ab(3, 4)));
        assert_eq!(reconciler.reconcile_call_args("3, b=4", &schema), Ok(ab(3, 4)));
        assert_eq!(
            reconciler.reconcile_call_args("3,,4", &schema),
            Err(CalcError::ParameterCountMismatch { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_custom_synonyms() {
        let mut table = SynonymTable::empty();
        table.insert("augend", 0);
        table.insert("addend", 1);
        let reconciler = Reconciler::new(table);
        let raw = json!({"addend": 7, "augend": 5, "note": "x"});
        assert_eq!(reconciler.reconcile(Some(&raw), &add_schema()), Ok(ab(5, 7)));
    }

    #[test]
    fn test_integer_text_beyond_i64_is_rejected() {
        let schema = add_schema();
        assert_eq!(
            reconcile(json!(["-9223372036854775809", 0]), &schema),
            Err(CalcError::InvalidParameterType {
                name: "a".to_string(),
                value: "-9223372036854775809".to_string(),
            })
        );
        assert!(matches!(
            reconcile(json!({"a": "99999999999999999999", "b": 1}), &schema),
            Err(CalcError::InvalidParameterType { .. })
        ));
        let sqrt = OperationSchema::new("sqrt").real("a");
        let out = reconcile(json!(["100000000000000000000"]), &sqrt).unwrap();
        assert_eq!(out.get("a"), Some(&Number::Real(1e20)));
    }

    #[test]
    fn test_large_float_out_of_range() {
        let err = reconcile(json!({"a": 1e20, "b": 1}), &add_schema());
        assert!(matches!(err, Err(CalcError::TypeMismatch { .. })));
    }
}
