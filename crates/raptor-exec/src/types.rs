//! Foundational public types for the raptor-exec library.
//!
//! This module defines the structures that cross the library boundary:
//! - [`TestCase`] — one input/expected pair supplied by the caller
//! - [`TestVerdict`] — the pass/fail record for one test case
//! - [`SuiteVerdict`] — the aggregate outcome of a submission
//! - [`ExecutionFault`] — structured failure variants
//! - [`RunConfig`] — per-suite configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// Default per-test deadline in milliseconds.
pub const DEFAULT_DEADLINE_MS: u64 = 5_000;

/// Lower bound on the per-test deadline.
pub const MIN_DEADLINE_MS: u64 = 1;

/// Upper bound on the per-test deadline.
pub const MAX_DEADLINE_MS: u64 = 60_000;

/// One test case: named inputs for the entry point and the expected result.
///
/// Built by external loaders; the core only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Parameter name to value; handed to the entry point as keyword
    /// arguments.
    pub input: BTreeMap<String, Value>,
    /// The value the entry point is expected to return.
    pub expected: Value,
    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Advisory flag set by loaders for cases whose details should not be
    /// shown to the user. Not enforced here.
    #[serde(default)]
    pub hidden: bool,
}

impl TestCase {
    pub fn new(input: BTreeMap<String, Value>, expected: Value) -> Self {
        Self {
            input,
            expected,
            description: None,
            hidden: false,
        }
    }
}

/// Pass/fail record for a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestVerdict {
    /// The test case this verdict refers to.
    pub test_case: TestCase,
    pub passed: bool,
    /// The entry point's return value. Absent on timeouts and on faults that
    /// prevented the entry point from returning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// Wall-clock duration of the entry-point invocation, in milliseconds.
    pub elapsed_ms: u64,
    /// Present exactly when `passed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Aggregate outcome of one submission run.
///
/// `test_results` holds verdicts in the caller's test-case order and, on
/// failure, ends at the first non-passing verdict. Suite-level fatals
/// (syntax, crashed worker) are reported as the `Err` arm of
/// [`run_suite`](crate::runner::run_suite) instead and carry no partial
/// verdict list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteVerdict {
    /// True when every test case produced a passing verdict.
    pub success: bool,
    pub test_results: Vec<TestVerdict>,
    /// Sum of the per-test `elapsed_ms` values. Supervision and process
    /// spawn overhead is not included.
    pub total_elapsed_ms: u64,
}

/// Structured failure variants.
///
/// The display strings double as the user-visible verdict messages, so their
/// wording is part of the contract. Serialized with an internally-tagged
/// `"type"` discriminator.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionFault {
    /// The submission could not be parsed. Fatal for the whole suite.
    #[error("syntax error at line {line}: {message}")]
    Syntax {
        /// 1-based line of the error, or 0 if unknown.
        line: u32,
        message: String,
    },

    /// An exception escaped user code or the entry-point invocation.
    #[error("{exception}: {message}")]
    Runtime {
        /// Exception class name, e.g. `ZeroDivisionError`.
        exception: String,
        message: String,
    },

    /// The worker did not finish before the deadline and was killed.
    #[error("Timeout: exceeded {} seconds", format_deadline_seconds(*.deadline_ms))]
    Timeout { deadline_ms: u64 },

    /// The submission parses but does not define the entry function.
    #[error("Function '{name}' not found in code")]
    MissingEntry { name: String },

    /// The worker exited without delivering an outcome. Fatal for the suite.
    #[error("worker crashed: {detail}")]
    WorkerCrashed { detail: String },
}

/// Per-suite configuration. Nothing else is recognized by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Wall-clock deadline per test case, in milliseconds. Values outside
    /// [`MIN_DEADLINE_MS`]..=[`MAX_DEADLINE_MS`] are clamped.
    pub deadline_ms: u64,
    /// Advisory memory hint in MiB, reserved for platform-level enforcement.
    /// Currently unenforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_hint_mb: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_DEADLINE_MS,
            memory_hint_mb: None,
        }
    }
}

impl RunConfig {
    /// The deadline actually enforced, after clamping.
    pub fn effective_deadline_ms(&self) -> u64 {
        self.deadline_ms.clamp(MIN_DEADLINE_MS, MAX_DEADLINE_MS)
    }
}

/// `1000 → "1"`, `1500 → "1.5"` — the `<N>` in the timeout message.
fn format_deadline_seconds(deadline_ms: u64) -> String {
    if deadline_ms % 1_000 == 0 {
        (deadline_ms / 1_000).to_string()
    } else {
        format!("{}", deadline_ms as f64 / 1_000.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.deadline_ms, 5_000);
        assert_eq!(config.memory_hint_mb, None);
    }

    #[test]
    fn test_deadline_clamping() {
        let zero = RunConfig {
            deadline_ms: 0,
            ..RunConfig::default()
        };
        assert_eq!(zero.effective_deadline_ms(), MIN_DEADLINE_MS);

        let huge = RunConfig {
            deadline_ms: 3_600_000,
            ..RunConfig::default()
        };
        assert_eq!(huge.effective_deadline_ms(), MAX_DEADLINE_MS);

        let in_range = RunConfig {
            deadline_ms: 2_000,
            ..RunConfig::default()
        };
        assert_eq!(in_range.effective_deadline_ms(), 2_000);
    }

    #[test]
    fn test_timeout_message_wording() {
        let fault = ExecutionFault::Timeout { deadline_ms: 1_000 };
        assert_eq!(fault.to_string(), "Timeout: exceeded 1 seconds");

        let fault = ExecutionFault::Timeout { deadline_ms: 1_500 };
        assert_eq!(fault.to_string(), "Timeout: exceeded 1.5 seconds");
    }

    #[test]
    fn test_missing_entry_message_wording() {
        let fault = ExecutionFault::MissingEntry {
            name: "solution".to_string(),
        };
        assert_eq!(fault.to_string(), "Function 'solution' not found in code");
    }

    #[test]
    fn test_runtime_message_carries_exception_name() {
        let fault = ExecutionFault::Runtime {
            exception: "ZeroDivisionError".to_string(),
            message: "division by zero".to_string(),
        };
        assert_eq!(fault.to_string(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_fault_serde_round_trip() {
        let faults = [
            ExecutionFault::Syntax {
                line: 3,
                message: "invalid syntax".to_string(),
            },
            ExecutionFault::Runtime {
                exception: "ValueError".to_string(),
                message: "bad".to_string(),
            },
            ExecutionFault::Timeout { deadline_ms: 2_000 },
            ExecutionFault::MissingEntry {
                name: "f".to_string(),
            },
            ExecutionFault::WorkerCrashed {
                detail: "no outcome".to_string(),
            },
        ];
        for fault in &faults {
            let json = serde_json::to_string(fault).expect("serialize fault");
            assert!(json.contains(r#""type":"#), "missing tag in {json}");
            let back: ExecutionFault = serde_json::from_str(&json).expect("deserialize fault");
            assert_eq!(&back, fault);
        }
    }

    #[test]
    fn test_test_case_serde_defaults() {
        let json = r#"{"input":{},"expected":{"type":"Int","value":1}}"#;
        let case: TestCase = serde_json::from_str(json).expect("deserialize case");
        assert_eq!(case.description, None);
        assert!(!case.hidden);
    }
}
