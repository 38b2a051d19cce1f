//! Suite-level orchestration: validate, supervise case by case, compare,
//! aggregate.
//!
//! The loop is deliberately sequential with first-failure early stop — fast
//! feedback is the product behavior, not an optimization. Verdicts appear in
//! the caller's order and, on failure, the list ends at the first non-passing
//! verdict.
//!
//! Fault routing follows a fixed policy: syntax faults and crashed workers
//! abort the whole suite (the `Err` arm — "we could not run the code"), while
//! runtime errors, timeouts, wrong answers, and a missing entry point become
//! per-test verdicts ("the code ran and failed").

use tracing::debug;

use crate::compare::values_equal;
use crate::supervisor::{CaseOutcome, Supervisor};
use crate::syntax::validate_syntax;
use crate::types::{ExecutionFault, RunConfig, SuiteVerdict, TestCase, TestVerdict};
use crate::worker::WorkerOutcome;

/// Runs submissions against test suites with a fixed configuration.
#[derive(Debug, Clone)]
pub struct TestRunner {
    config: RunConfig,
    supervisor: Supervisor,
}

impl TestRunner {
    /// Build a runner, locating the worker executable automatically.
    pub fn new(config: RunConfig) -> Result<Self, ExecutionFault> {
        Ok(Self {
            config,
            supervisor: Supervisor::discover()?,
        })
    }

    /// Build a runner around an explicitly provided worker executable.
    pub fn with_worker_path(config: RunConfig, worker_path: std::path::PathBuf) -> Self {
        Self {
            config,
            supervisor: Supervisor::with_worker_path(worker_path),
        }
    }

    /// Execute `source` against `test_cases` in order.
    ///
    /// Test cases are borrowed for the duration of the call and never
    /// mutated; inputs reach user code as serialized copies.
    pub fn run_suite(
        &self,
        source: &str,
        test_cases: &[TestCase],
        entry_point: &str,
    ) -> Result<SuiteVerdict, ExecutionFault> {
        validate_syntax(source)?;

        let deadline_ms = self.config.effective_deadline_ms();
        debug!(cases = test_cases.len(), deadline_ms, entry_point, "running suite");

        let mut test_results: Vec<TestVerdict> = Vec::new();
        let mut total_elapsed_ms = 0u64;

        for test_case in test_cases {
            let outcome = self.supervisor.run_one(
                source,
                test_case,
                entry_point,
                deadline_ms,
                self.config.memory_hint_mb,
            )?;

            let verdict = match outcome {
                CaseOutcome::TimedOut { deadline_ms } => failed_verdict(
                    test_case,
                    ExecutionFault::Timeout { deadline_ms }.to_string(),
                    deadline_ms,
                ),
                CaseOutcome::Finished(reply) => match reply.outcome {
                    WorkerOutcome::Completed { actual, elapsed_ms } => {
                        let passed = values_equal(&actual, &test_case.expected);
                        let error_message = (!passed).then(|| {
                            format!("Expected {}, got {}", test_case.expected, actual)
                        });
                        TestVerdict {
                            test_case: test_case.clone(),
                            passed,
                            actual: Some(actual),
                            elapsed_ms,
                            error_message,
                        }
                    }
                    WorkerOutcome::Failed { fault } => match fault {
                        // The worker hit something the suite cannot recover
                        // from; mirror the supervisor-level policy.
                        fatal @ (ExecutionFault::Syntax { .. }
                        | ExecutionFault::WorkerCrashed { .. }) => return Err(fatal),
                        per_test => failed_verdict(test_case, per_test.to_string(), 0),
                    },
                },
            };

            total_elapsed_ms += verdict.elapsed_ms;
            let passed = verdict.passed;
            test_results.push(verdict);
            if !passed {
                debug!(case = test_results.len(), "stopping at first failure");
                break;
            }
        }

        let success =
            test_results.len() == test_cases.len() && test_results.iter().all(|v| v.passed);
        Ok(SuiteVerdict {
            success,
            test_results,
            total_elapsed_ms,
        })
    }
}

/// Run one submission with an automatically discovered worker.
///
/// Convenience wrapper over [`TestRunner`]; `RunConfig::default()` gives the
/// 5-second per-test deadline.
pub fn run_suite(
    source: &str,
    test_cases: &[TestCase],
    entry_point: &str,
    config: &RunConfig,
) -> Result<SuiteVerdict, ExecutionFault> {
    TestRunner::new(config.clone())?.run_suite(source, test_cases, entry_point)
}

fn failed_verdict(test_case: &TestCase, error_message: String, elapsed_ms: u64) -> TestVerdict {
    TestVerdict {
        test_case: test_case.clone(),
        passed: false,
        actual: None,
        elapsed_ms,
        error_message: Some(error_message),
    }
}
