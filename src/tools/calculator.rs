//! 内置运算表
//!
//! 启动时由 builtin_registry 显式注册全部运算（名称 + 实现 + schema），不做任何按命名约定的反射查找。
//! 整数运算全部使用 checked_*，溢出作为计算错误返回。

use crate::core::Number;
use crate::tools::registry::{Args, OperationRegistry};
use crate::tools::schema::OperationSchema;

type Implementation = fn(&Args) -> Result<Number, String>;

/// 内置运算表：(名称, 实现, schema)
fn builtin_table() -> Vec<(&'static str, Implementation, OperationSchema)> {
    vec![
        ("add", add as Implementation, OperationSchema::new("Add two numbers").integer("a").integer("b")),
        ("subtract", subtract as Implementation, OperationSchema::new("Subtract b from a").integer("a").integer("b")),
        ("multiply", multiply as Implementation, OperationSchema::new("Multiply two numbers").integer("a").integer("b")),
        ("divide", divide as Implementation, OperationSchema::new("Divide a by b").integer("a").integer("b")),
        ("power", power as Implementation, OperationSchema::new("Raise a to the power b").integer("a").integer("b")),
        (
            "remainder",
            remainder as Implementation,
            OperationSchema::new("Remainder of a divided by b").integer("a").integer("b"),
        ),
        ("factorial", factorial as Implementation, OperationSchema::new("Factorial of a number").integer("a")),
        ("sqrt", sqrt as Implementation, OperationSchema::new("Square root of a number").real("a")),
        ("cbrt", cbrt as Implementation, OperationSchema::new("Cube root of a number").real("a")),
        (
            "log",
            log as Implementation,
            OperationSchema::new("Logarithm of a (natural unless base is given)")
                .real("a")
                .optional_real("base"),
        ),
        ("sin", sin as Implementation, OperationSchema::new("Sine of an angle in radians").real("a")),
        ("cos", cos as Implementation, OperationSchema::new("Cosine of an angle in radians").real("a")),
        ("tan", tan as Implementation, OperationSchema::new("Tangent of an angle in radians").real("a")),
    ]
}

/// 构建包含全部内置运算的注册表
pub fn builtin_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    for (name, implementation, schema) in builtin_table() {
        registry.register(name, implementation, schema);
    }
    tracing::debug!("Registered {} builtin operations", registry.len());
    registry
}

fn overflow(op: &str) -> String {
    format!("integer overflow in {op}")
}

fn add(args: &Args) -> Result<Number, String> {
    args.int(0)?
        .checked_add(args.int(1)?)
        .map(Number::Int)
        .ok_or_else(|| overflow("add"))
}

fn subtract(args: &Args) -> Result<Number, String> {
    args.int(0)?
        .checked_sub(args.int(1)?)
        .map(Number::Int)
        .ok_or_else(|| overflow("subtract"))
}

fn multiply(args: &Args) -> Result<Number, String> {
    args.int(0)?
        .checked_mul(args.int(1)?)
        .map(Number::Int)
        .ok_or_else(|| overflow("multiply"))
}

fn divide(args: &Args) -> Result<Number, String> {
    let (a, b) = (args.int(0)?, args.int(1)?);
    if b == 0 {
        return Err("division by zero".to_string());
    }
    Ok(Number::Real(a as f64 / b as f64))
}

fn power(args: &Args) -> Result<Number, String> {
    let (a, b) = (args.int(0)?, args.int(1)?);
    // 底数为 -1 / 0 / 1 时结果与指数大小无关
    match a {
        1 if b >= 0 => return Ok(Number::Int(1)),
        1 => return Ok(Number::Real(1.0)),
        -1 if b >= 0 => return Ok(Number::Int(if b % 2 == 0 { 1 } else { -1 })),
        -1 => return Ok(Number::Real(if b % 2 == 0 { 1.0 } else { -1.0 })),
        0 if b > 0 => return Ok(Number::Int(0)),
        _ => {}
    }
    if b >= 0 {
        let exp = u32::try_from(b).map_err(|_| overflow("power"))?;
        return a.checked_pow(exp).map(Number::Int).ok_or_else(|| overflow("power"));
    }
    if a == 0 {
        return Err("zero cannot be raised to a negative power".to_string());
    }
    let exp = i32::try_from(b).map_err(|_| overflow("power"))?;
    Ok(Number::Real((a as f64).powi(exp)))
}

fn remainder(args: &Args) -> Result<Number, String> {
    let (a, b) = (args.int(0)?, args.int(1)?);
    if b == 0 {
        return Err("division by zero".to_string());
    }
    // 与除数同号（floored modulo）
    let r = a.checked_rem(b).ok_or_else(|| overflow("remainder"))?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(Number::Int(r + b))
    } else {
        Ok(Number::Int(r))
    }
}

fn factorial(args: &Args) -> Result<Number, String> {
    let a = args.int(0)?;
    if a < 0 {
        return Err("factorial of a negative number".to_string());
    }
    (1..=a)
        .try_fold(1i64, |acc, v| acc.checked_mul(v))
        .map(Number::Int)
        .ok_or_else(|| overflow("factorial"))
}

fn sqrt(args: &Args) -> Result<Number, String> {
    let a = args.real(0)?;
    if a < 0.0 {
        return Err("square root of a negative number".to_string());
    }
    Ok(Number::Real(a.sqrt()))
}

fn cbrt(args: &Args) -> Result<Number, String> {
    Ok(Number::Real(args.real(0)?.cbrt()))
}

fn log(args: &Args) -> Result<Number, String> {
    let a = args.real(0)?;
    if a <= 0.0 {
        return Err("logarithm of a non-positive number".to_string());
    }
    match args.opt_real(1) {
        None => Ok(Number::Real(a.ln())),
        Some(base) if base > 0.0 && base != 1.0 => Ok(Number::Real(a.log(base))),
        Some(base) => Err(format!("invalid logarithm base {base}")),
    }
}

fn sin(args: &Args) -> Result<Number, String> {
    Ok(Number::Real(args.real(0)?.sin()))
}

fn cos(args: &Args) -> Result<Number, String> {
    Ok(Number::Real(args.real(0)?.cos()))
}

fn tan(args: &Args) -> Result<Number, String> {
    Ok(Number::Real(args.real(0)?.tan()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::Operation;

    fn i(v: i64) -> Number {
        Number::Int(v)
    }

    fn call(name: &str, values: &[Number]) -> Result<Number, String> {
        let registry = builtin_registry();
        let (op, schema) = registry.resolve(name).unwrap();
        let mut padded: Vec<Option<Number>> = values.iter().copied().map(Some).collect();
        padded.resize(schema.params.len(), None);
        op.call(&Args::new(padded))
    }

    #[test]
    fn test_builtin_names() {
        let names = builtin_registry().operation_names();
        for name in ["add", "subtract", "multiply", "divide", "power", "sqrt", "log", "tan"] {
            assert!(names.iter().any(|n| n == name), "{name} missing");
        }
        assert_eq!(names.len(), builtin_table().len());
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(call("add", &[i(5), i(7)]), Ok(Number::Int(12)));
        assert_eq!(call("subtract", &[i(5), i(7)]), Ok(Number::Int(-2)));
        assert_eq!(call("multiply", &[i(3), i(4)]), Ok(Number::Int(12)));
        assert_eq!(call("power", &[i(2), i(10)]), Ok(Number::Int(1024)));
        assert_eq!(call("power", &[i(2), i(-1)]), Ok(Number::Real(0.5)));
        assert_eq!(call("factorial", &[i(5)]), Ok(Number::Int(120)));
        assert_eq!(call("remainder", &[i(7), i(3)]), Ok(Number::Int(1)));
        assert_eq!(call("remainder", &[i(-7), i(3)]), Ok(Number::Int(2)));
    }

    #[test]
    fn test_divide_returns_real() {
        assert_eq!(call("divide", &[i(7), i(2)]), Ok(Number::Real(3.5)));
    }

    #[test]
    fn test_domain_errors() {
        assert!(call("divide", &[i(1), i(0)]).unwrap_err().contains("division by zero"));
        assert!(call("remainder", &[i(1), i(0)]).is_err());
        assert!(call("sqrt", &[Number::Real(-4.0)]).is_err());
        assert!(call("log", &[Number::Real(0.0)]).is_err());
        assert!(call("log", &[Number::Real(8.0), Number::Real(1.0)]).is_err());
        assert!(call("factorial", &[i(-1)]).is_err());
        assert!(call("power", &[i(0), i(-2)]).is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(call("add", &[i64::MAX.into(), i(1)]).unwrap_err().contains("overflow"));
        assert!(call("factorial", &[i(21)]).is_err());
        assert_eq!(call("factorial", &[i(20)]), Ok(Number::Int(2_432_902_008_176_640_000)));
        assert!(call("power", &[i(2), i(i64::MAX)]).unwrap_err().contains("overflow"));
    }

    #[test]
    fn test_power_with_trivial_base_and_huge_exponent() {
        assert_eq!(call("power", &[i(1), i(i64::MAX)]), Ok(Number::Int(1)));
        assert_eq!(call("power", &[i(0), i(i64::MAX)]), Ok(Number::Int(0)));
        assert_eq!(call("power", &[i(-1), i(i64::MAX)]), Ok(Number::Int(-1)));
        assert_eq!(call("power", &[i(-1), i(1 << 40)]), Ok(Number::Int(1)));
        assert_eq!(call("power", &[i(-1), i(i64::MIN)]), Ok(Number::Real(1.0)));
        assert_eq!(call("power", &[i(0), i(0)]), Ok(Number::Int(1)));
    }

    #[test]
    fn test_log_with_base() {
        let v = call("log", &[Number::Real(8.0), Number::Real(2.0)]).unwrap();
        assert!((v.as_f64() - 3.0).abs() < 1e-12);
        assert_eq!(call("sqrt", &[Number::Real(16.0)]), Ok(Number::Real(4.0)));
    }
}
