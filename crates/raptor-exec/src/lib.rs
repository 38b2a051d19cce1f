// raptor-exec: sandboxed execution core for algorithm-practice submissions.
//
// A submission is validated, then run one test case at a time inside a
// dedicated worker process (the `raptor-worker` binary) under a wall-clock
// deadline; returned values are compared against expectations with
// type-aware rules and aggregated into a suite verdict.

pub mod compare;
pub mod entry_point;
pub mod output;
pub mod runner;
pub mod sandbox;
pub mod supervisor;
pub mod syntax;
pub mod types;
pub mod value;
pub mod worker;
pub(crate) mod vm;

pub use compare::{values_equal, FLOAT_TOLERANCE};
pub use entry_point::{entry_point_from_signature, DEFAULT_ENTRY_POINT};
pub use runner::{run_suite, TestRunner};
pub use sandbox::SANDBOX_BUILTINS;
pub use supervisor::{CaseOutcome, Supervisor};
pub use syntax::validate_syntax;
pub use types::{
    ExecutionFault, RunConfig, SuiteVerdict, TestCase, TestVerdict, DEFAULT_DEADLINE_MS,
    MAX_DEADLINE_MS, MIN_DEADLINE_MS,
};
pub use value::Value;
pub use worker::{worker_main, WorkerOutcome, WorkerPayload, WorkerReply};
