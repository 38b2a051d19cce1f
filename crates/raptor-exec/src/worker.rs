//! Child-worker side of the supervisor protocol.
//!
//! The supervisor spawns the `raptor-worker` binary once per test case. The
//! worker reads one JSON [`WorkerPayload`] from stdin, runs the case inside a
//! sandboxed interpreter, and prints one JSON [`WorkerReply`] on stdout. The
//! process always exits 0 — faults travel inside the reply, and an absent or
//! malformed reply is how the supervisor recognizes a crashed worker.
//!
//! Stdout is reserved for the reply: user `print` output is captured inside
//! the VM (see [`crate::output`]) and rides along in the reply's diagnostic
//! fields instead.

use std::collections::BTreeMap;
use std::io::{self, Read};

use serde::{Deserialize, Serialize};

use crate::types::ExecutionFault;
use crate::value::Value;
use crate::vm;

/// What the supervisor sends the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPayload {
    /// Full submission source text.
    pub source: String,
    /// The test case's input mapping; becomes keyword arguments.
    pub input: BTreeMap<String, Value>,
    /// Name the entry function must have.
    pub entry_point: String,
    /// Advisory memory hint from the caller's configuration. Unenforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_hint_mb: Option<u64>,
}

/// How one case ended inside the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerOutcome {
    /// The entry point returned. Comparison happens on the supervisor side;
    /// the worker never sees the expected value.
    Completed {
        actual: Value,
        /// Duration of the entry-point invocation, rounded to whole
        /// milliseconds.
        elapsed_ms: u64,
    },
    /// Compilation, evaluation, lookup, or invocation failed.
    Failed { fault: ExecutionFault },
}

/// The single message the worker prints on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub outcome: WorkerOutcome,
    /// Captured user stdout; diagnostic only.
    #[serde(default)]
    pub stdout: String,
    /// Captured user stderr; diagnostic only.
    #[serde(default)]
    pub stderr: String,
}

impl WorkerReply {
    pub(crate) fn failed(fault: ExecutionFault) -> Self {
        Self {
            outcome: WorkerOutcome::Failed { fault },
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Entry point of the `raptor-worker` binary.
///
/// Never panics on bad input: a payload that cannot be read or decoded
/// produces a `WorkerCrashed` fault in the reply.
pub fn worker_main() {
    let mut raw = String::new();
    let reply = match io::stdin().read_to_string(&mut raw) {
        Ok(_) => match serde_json::from_str::<WorkerPayload>(&raw) {
            Ok(payload) => vm::run_case(&payload),
            Err(err) => WorkerReply::failed(ExecutionFault::WorkerCrashed {
                detail: format!("malformed payload: {err}"),
            }),
        },
        Err(err) => WorkerReply::failed(ExecutionFault::WorkerCrashed {
            detail: format!("failed to read payload: {err}"),
        }),
    };

    // The reply contains only JSON-safe data by construction.
    let json = serde_json::to_string(&reply).expect("WorkerReply is always serializable");
    println!("{json}");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
