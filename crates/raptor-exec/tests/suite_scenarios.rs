//! End-to-end scenarios for `run_suite`, driving real worker processes.
//!
//! Each test spawns the actual `raptor-worker` binary (resolved at compile
//! time via `CARGO_BIN_EXE_raptor-worker`), so the full pipeline is covered:
//! validation, sandbox, process supervision, comparison, aggregation.
//!
//! Run with: `cargo test -p raptor-exec --test suite_scenarios`

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use raptor_exec::{RunConfig, TestCase, TestRunner, Value};

fn runner(deadline_ms: u64) -> TestRunner {
    TestRunner::with_worker_path(
        RunConfig {
            deadline_ms,
            memory_hint_mb: None,
        },
        PathBuf::from(env!("CARGO_BIN_EXE_raptor-worker")),
    )
}

fn case(input: &[(&str, Value)], expected: Value) -> TestCase {
    TestCase::new(
        input
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
        expected,
    )
}

/// Correct solution, single case.
#[test]
fn test_correct_solution_single_case() {
    let verdict = runner(2_000)
        .run_suite(
            "def solution(x):\n    return x * 2\n",
            &[case(&[("x", Value::Int(5))], Value::Int(10))],
            "solution",
        )
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
    assert_eq!(verdict.test_results.len(), 1);
    let result = &verdict.test_results[0];
    assert!(result.passed);
    assert_eq!(result.actual, Some(Value::Int(10)));
    assert_eq!(result.error_message, None);
}

/// Wrong answer: message names both the expected and the actual value.
#[test]
fn test_wrong_answer_message() {
    let verdict = runner(2_000)
        .run_suite(
            "def solution(x):\n    return x + 1\n",
            &[case(&[("x", Value::Int(5))], Value::Int(10))],
            "solution",
        )
        .expect("suite should run");

    assert!(!verdict.success);
    let result = &verdict.test_results[0];
    assert!(!result.passed);
    assert_eq!(result.actual, Some(Value::Int(6)));
    let message = result.error_message.as_deref().expect("message present");
    assert!(message.contains("10"), "missing expected value in: {message}");
    assert!(message.contains("6"), "missing actual value in: {message}");
}

/// An infinite loop is killed at the deadline and reported as a timeout.
#[test]
fn test_timeout_is_enforced() {
    let started = Instant::now();
    let verdict = runner(1_000)
        .run_suite(
            "def solution(x):\n    while True:\n        pass\n",
            &[case(&[("x", Value::Int(0))], Value::Int(0))],
            "solution",
        )
        .expect("suite should run");
    let wall = started.elapsed();

    assert!(!verdict.success);
    let result = &verdict.test_results[0];
    assert!(!result.passed);
    assert_eq!(result.actual, None);
    let message = result.error_message.as_deref().expect("message present");
    assert!(
        message.starts_with("Timeout"),
        "expected a timeout message, got: {message}"
    );
    assert_eq!(result.elapsed_ms, 1_000);
    assert!(
        wall.as_millis() < 4_000,
        "run_suite took {}ms for a 1000ms deadline",
        wall.as_millis()
    );
}

/// A raised exception surfaces with its class name.
#[test]
fn test_runtime_error_surfaced() {
    let verdict = runner(2_000)
        .run_suite(
            "def solution(x):\n    return 1 / 0\n",
            &[case(&[("x", Value::Int(1))], Value::Int(0))],
            "solution",
        )
        .expect("suite should run");

    assert!(!verdict.success);
    let message = verdict.test_results[0]
        .error_message
        .as_deref()
        .expect("message present")
        .to_lowercase();
    assert!(
        message.contains("zerodivision"),
        "expected ZeroDivision in: {message}"
    );
}

/// Submission that never defines the entry point.
#[test]
fn test_missing_entry_point() {
    let verdict = runner(2_000)
        .run_suite(
            "def other(x):\n    return x\n",
            &[case(&[("x", Value::Int(1))], Value::Int(1))],
            "solution",
        )
        .expect("suite should run");

    assert!(!verdict.success);
    let result = &verdict.test_results[0];
    assert_eq!(result.elapsed_ms, 0);
    assert_eq!(result.actual, None);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Function 'solution' not found in code")
    );
}

/// Float results compare under the 1e-9 tolerance.
#[test]
fn test_float_tolerance() {
    let verdict = runner(2_000)
        .run_suite(
            "def solution():\n    return 0.1 + 0.2\n",
            &[case(&[], Value::Float(0.3))],
            "solution",
        )
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
}

/// Imports are outside the sandbox whitelist and fail at runtime.
#[test]
fn test_sandbox_rejects_import() {
    let verdict = runner(2_000)
        .run_suite(
            "import os\n\ndef solution():\n    return 0\n",
            &[case(&[], Value::Int(0))],
            "solution",
        )
        .expect("suite should run");

    assert!(!verdict.success);
    let message = verdict.test_results[0]
        .error_message
        .as_deref()
        .expect("message present");
    assert!(message.contains("os"), "expected module name in: {message}");
}

/// Names outside the whitelist resolve to nothing.
#[test]
fn test_sandbox_rejects_unlisted_builtin() {
    let verdict = runner(2_000)
        .run_suite(
            "def solution():\n    return open('/etc/passwd')\n",
            &[case(&[], Value::Int(0))],
            "solution",
        )
        .expect("suite should run");

    assert!(!verdict.success);
    let message = verdict.test_results[0]
        .error_message
        .as_deref()
        .expect("message present");
    assert!(message.contains("open"), "expected name in: {message}");
}

/// Whitelisted builtins keep working inside the sandbox.
#[test]
fn test_sandbox_allows_whitelisted_builtins() {
    let source = "def solution(xs):\n    return sorted(set(xs))[:2] + [len(xs)]\n";
    let verdict = runner(2_000)
        .run_suite(
            source,
            &[case(
                &[(
                    "xs",
                    Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(3)]),
                )],
                Value::List(vec![Value::Int(1), Value::Int(3), Value::Int(3)]),
            )],
            "solution",
        )
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
}

/// User prints are captured and must not corrupt the reply protocol.
#[test]
fn test_print_does_not_break_the_protocol() {
    let source = "def solution(x):\n    print('debugging', x)\n    return x\n";
    let verdict = runner(2_000)
        .run_suite(
            source,
            &[case(&[("x", Value::Int(7))], Value::Int(7))],
            "solution",
        )
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
}

/// Inputs arrive as keyword arguments, independent of declaration order.
#[test]
fn test_inputs_are_keyword_arguments() {
    let source = "def solution(b, a):\n    return a - b\n";
    let verdict = runner(2_000)
        .run_suite(
            source,
            &[case(
                &[("a", Value::Int(10)), ("b", Value::Int(4))],
                Value::Int(6),
            )],
            "solution",
        )
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
}

/// Structured return values round-trip: dict of list/tuple/unit.
#[test]
fn test_structured_return_values() {
    let source = "def solution():\n    return {'xs': [1, 2], 'pair': (1.5, None), 'ok': True}\n";
    let expected = Value::map_from([
        ("xs", Value::List(vec![Value::Int(1), Value::Int(2)])),
        ("pair", Value::Tuple(vec![Value::Float(1.5), Value::Unit])),
        ("ok", Value::Bool(true)),
    ]);
    let verdict = runner(2_000)
        .run_suite(source, &[case(&[], expected)], "solution")
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
}

/// A tuple returned against a list expectation still matches.
#[test]
fn test_tuple_matches_list_expectation() {
    let source = "def solution():\n    return (1, 2)\n";
    let verdict = runner(2_000)
        .run_suite(
            source,
            &[case(&[], Value::List(vec![Value::Int(1), Value::Int(2)]))],
            "solution",
        )
        .expect("suite should run");

    assert!(verdict.success, "expected success, got {verdict:?}");
}
