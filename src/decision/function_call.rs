//! 运算调用字符串解析：`add(5, 7)`、`add(a=5, b=7)`、`calculator.add`、`add()`
//!
//! 只识别「名称 + 可选括号参数列表」这一种形状，不做表达式求值。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(?:\((.*)\))?\s*;?\s*$")
            .expect("function call pattern is valid")
    })
}

/// 解析后的调用：运算名（小写、去命名空间）与原始参数（字符串形式，留给 Reconciler 收窄）
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// 位置参数为 Array，关键字参数为 Object；无参数或空括号为 None
    pub args: Option<Value>,
}

impl FunctionCall {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = call_pattern().captures(text)?;
        let raw_name = caps.get(1)?.as_str();
        let name = raw_name
            .rsplit('.')
            .next()
            .unwrap_or(raw_name)
            .to_lowercase();
        if name.is_empty() {
            return None;
        }
        let args = caps.get(2).and_then(|m| parse_args(m.as_str()));
        Some(Self { name, args })
    }
}

/// 参数列表：全部为 `k=v` / `k: v` 时解析为对象，全部为位置参数时为字符串数组；
/// 两者混用时也解析为对象，第 n 个位置参数记为 `argn`（同义词表把它映射回第 n 个参数）
pub fn parse_args(inner: &str) -> Option<Value> {
    let pieces = split_top_level(inner);
    if pieces.is_empty() {
        return None;
    }
    let keyword: Vec<Option<(String, String)>> =
        pieces.iter().map(|p| split_keyword(p)).collect();

    if keyword.iter().all(Option::is_none) {
        return Some(Value::Array(
            pieces.iter().map(|p| Value::String(unquote(p))).collect(),
        ));
    }

    let map: Map<String, Value> = pieces
        .iter()
        .zip(keyword)
        .enumerate()
        .map(|(idx, (piece, kw))| match kw {
            Some((k, v)) => (k, Value::String(v)),
            None => (format!("arg{}", idx + 1), Value::String(unquote(piece))),
        })
        .collect();
    Some(Value::Object(map))
}

/// 按顶层逗号切分（忽略引号与括号内的逗号）；中间的空段保留，
/// 只有空参数列表和末尾多余的一个逗号不产生参数
fn split_top_level(inner: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                ',' if depth == 0 => pieces.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            },
        }
    }
    pieces.push(current);
    let mut pieces: Vec<String> = pieces.into_iter().map(|p| p.trim().to_string()).collect();
    if pieces.last().is_some_and(|p| p.is_empty()) {
        pieces.pop();
    }
    pieces
}

fn split_keyword(piece: &str) -> Option<(String, String)> {
    let idx = piece.find(&['=', ':'][..])?;
    let key = unquote(&piece[..idx]);
    let value = unquote(&piece[idx + 1..]);
    let is_identifier = !key.is_empty()
        && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ' ');
    if is_identifier {
        Some((key, value))
    } else {
        None
    }
}

fn unquote(s: &str) -> String {
    s.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_call() {
        let call = FunctionCall::parse("multiply(3, 4)").unwrap();
        assert_eq!(call.name, "multiply");
        assert_eq!(call.args, Some(json!(["3", "4"])));
    }

    #[test]
    fn test_keyword_call() {
        let call = FunctionCall::parse("add(a=5, b: \"7\")").unwrap();
        assert_eq!(call.args, Some(json!({"a": "5", "b": "7"})));
    }

    #[test]
    fn test_bare_and_empty_calls() {
        assert_eq!(
            FunctionCall::parse("  ADD "),
            Some(FunctionCall { name: "add".to_string(), args: None })
        );
        assert_eq!(FunctionCall::parse("sqrt()").unwrap().args, None);
        assert_eq!(FunctionCall::parse("calculator.sqrt(9)").unwrap().name, "sqrt");
    }

    #[test]
    fn test_not_a_call() {
        assert_eq!(FunctionCall::parse("add 5 and 7"), None);
        assert_eq!(FunctionCall::parse(""), None);
        assert_eq!(FunctionCall::parse("5 + 7"), None);
    }

    #[test]
    fn test_empty_pieces_are_kept() {
        assert_eq!(parse_args("5,,7"), Some(json!(["5", "", "7"])));
        assert_eq!(parse_args("5, 7,"), Some(json!(["5", "7"])));
        assert_eq!(parse_args("  "), None);
    }

    #[test]
    fn test_mixed_positional_and_keyword() {
        assert_eq!(parse_args("5, b=7"), Some(json!({"arg1": "5", "b": "7"})));
    }

    #[test]
    fn test_quoted_commas_stay_together() {
        let call = FunctionCall::parse("add('1,000', 2)").unwrap();
        assert_eq!(call.args, Some(json!(["1,000", "2"])));
    }
}
