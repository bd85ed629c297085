//! 端到端流程测试：oracle 回复 -> 抽取 -> 记忆 -> 计算

use std::sync::Arc;

use bee_calc::agent::CalcAgent;
use bee_calc::core::{CalcError, Number, Parameters};
use bee_calc::decision::{Extractor, Reconciler};
use bee_calc::llm::MockLlmClient;
use bee_calc::memory::{MemoryRecord, MemoryStore, RecordPersistence};
use bee_calc::tools::{builtin_registry, Dispatcher};

fn ints(pairs: &[(&str, i64)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Number::Int(*v)))
        .collect()
}

fn run(raw: &str) -> Result<Number, CalcError> {
    let registry = builtin_registry();
    let reconciler = Reconciler::default();
    let decision = Extractor::new(&registry, &reconciler).extract(raw)?;
    let dispatcher = Dispatcher::new(registry);
    dispatcher.dispatch(&decision).map(|r| r.value)
}

#[test]
fn test_numbered_params_add() {
    let raw = r#"{"task": "add", "function_call": "add", "function_call_params": {"param1": 5, "param2": 7}}"#;
    assert_eq!(run(raw), Ok(Number::Int(12)));
}

#[test]
fn test_call_string_multiply() {
    assert_eq!(run(r#"{"task": "multiply", "function_call": "multiply(3, 4)"}"#), Ok(Number::Int(12)));
}

#[test]
fn test_name_shapes_agree() {
    let shapes = [
        r#"{"task": "subtract", "function_call_params": {"a": 10, "b": 3}}"#,
        r#"{"task": "subtract", "function_call_params": {"first": 10, "second": 3}}"#,
        r#"{"task": "subtract", "function_call_params": [10, 3]}"#,
        r#"{"task": "subtract", "function_call_params": {"A": "10", "B": "3"}}"#,
        r#"{"function_call": "subtract(a=10, b=3)"}"#,
    ];
    for raw in shapes {
        assert_eq!(run(raw), Ok(Number::Int(7)), "{raw}");
    }
}

#[test]
fn test_invalid_value_in_prose() {
    let raw = r#"Sure! {"task":"add","function_call_params":{"a":5,"b":"seven"}}"#;
    assert_eq!(
        run(raw),
        Err(CalcError::InvalidParameterType {
            name: "b".to_string(),
            value: "seven".to_string(),
        })
    );
}

#[test]
fn test_unknown_operation() {
    let raw = r#"{"task": "divide_by_zero_specialop", "function_call_params": {"a": 1, "b": 0}}"#;
    assert_eq!(
        run(raw),
        Err(CalcError::UnknownOperation("divide_by_zero_specialop".to_string()))
    );
}

#[test]
fn test_computation_errors() {
    assert!(matches!(
        run(r#"{"task": "divide", "args": [1, 0]}"#),
        Err(CalcError::ComputationError { .. })
    ));
    assert!(matches!(
        run(r#"{"task": "sqrt", "args": [-4]}"#),
        Err(CalcError::ComputationError { .. })
    ));
    assert!(matches!(
        run(r#"{"task": "multiply", "args": [9223372036854775807, 2]}"#),
        Err(CalcError::ComputationError { .. })
    ));
}

#[test]
fn test_three_parameter_record_does_not_serve_two_parameter_query() {
    let mut store = MemoryStore::in_memory();
    store
        .append(MemoryRecord::new(
            "add 1, 2 and 3",
            "add",
            ints(&[("a", 1), ("b", 2), ("c", 3)]),
            Number::Int(6),
        ))
        .unwrap();

    let registry = builtin_registry();
    let reconciler = Reconciler::default();
    let decision = Extractor::new(&registry, &reconciler)
        .extract(r#"{"task": "add", "function_call": "add(1,2)"}"#)
        .unwrap();
    assert_eq!(decision.parameters, ints(&[("a", 1), ("b", 2)]));
    assert!(store
        .lookup_exact(&decision.operation_name, &decision.parameters)
        .is_none());
}

#[tokio::test]
async fn test_agent_reuses_persisted_memory_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory_data.json");

    let first = Arc::new(MockLlmClient::scripted([
        r#"{"task": "power", "function_call_params": {"base": 2, "exponent": 10}}"#,
    ]));
    let mut agent = CalcAgent::new(
        first,
        builtin_registry(),
        Reconciler::default(),
        MemoryStore::open(RecordPersistence::new(&path)),
    );
    let answer = agent.handle("2 to the 10th").await.unwrap();
    assert_eq!(answer.value, Number::Int(1024));
    assert!(!answer.from_memory);

    let second = Arc::new(MockLlmClient::scripted([
        r#"```json
{"task": "power", "function_call": "power(2, 10)"}
```"#,
    ]));
    let mut agent = CalcAgent::new(
        second,
        builtin_registry(),
        Reconciler::default(),
        MemoryStore::open(RecordPersistence::new(&path)),
    );
    let answer = agent.handle("two to the power of ten").await.unwrap();
    assert!(answer.from_memory);
    assert_eq!(answer.value, Number::Int(1024));
    assert_eq!(agent.memory().len(), 1);
}
