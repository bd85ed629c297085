//! 数值类型：参数声明的数值种类与归一化后的数值
//!
//! 归一化之后的一切（CanonicalDecision、DispatchResult、MemoryRecord）只使用 Number，
//! 字符串形式的数字只会出现在 Reconciler 之前。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 规范参数映射：参数名 -> 数值（键即 schema 声明的参数名）
pub type Parameters = BTreeMap<String, Number>;

/// 参数声明的数值种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    Integer,
    Real,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericKind::Integer => f.write_str("integer"),
            NumericKind::Real => f.write_str("real"),
        }
    }
}

/// 已校验的数值；JSON 中序列化为裸数字（5 / 2.5）
///
/// 相等性是精确的：Int 与 Real 永不相等，两个 Real 按位比较。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    pub fn kind(&self) -> NumericKind {
        match self {
            Number::Int(_) => NumericKind::Integer,
            Number::Real(_) => NumericKind::Real,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(v) => v as f64,
            Number::Real(v) => v,
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Number::Int(_) => true,
            Number::Real(v) => v.is_finite(),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Real(a), Number::Real(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Number {}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Real(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Real(v)
    }
}
