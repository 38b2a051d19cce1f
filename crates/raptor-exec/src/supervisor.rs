//! Per-test-case process supervision.
//!
//! One worker process is spawned per test case and owned for its whole life
//! by [`Supervisor::run_one`]: payload in via stdin, reply out via stdout,
//! wall-clock deadline enforced with a bounded wait. A worker that misses the
//! deadline is killed, given a short grace to be reaped, then killed again.
//! Process-level termination is the only mechanism that stops a tight loop
//! that never yields; nothing here relies on cooperation from user code.
//!
//! The child handle lives inside a guard that kills and reaps on drop, so an
//! early return or panic in the caller cannot leak a runnable child.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::types::{ExecutionFault, TestCase};
use crate::worker::{WorkerPayload, WorkerReply};

/// File name of the child executable.
const WORKER_BIN: &str = "raptor-worker";

/// How long a killed worker gets to disappear before the second kill.
const TERMINATION_GRACE: Duration = Duration::from_millis(100);

/// How one supervised case ended, before comparison.
#[derive(Debug)]
pub enum CaseOutcome {
    /// The worker exited in time and delivered a reply.
    Finished(WorkerReply),
    /// The deadline elapsed; the worker was killed and reaped.
    TimedOut { deadline_ms: u64 },
}

/// Owns worker processes for the duration of single test cases.
#[derive(Debug, Clone)]
pub struct Supervisor {
    worker_path: PathBuf,
}

impl Supervisor {
    /// Locate the worker executable next to the current one.
    ///
    /// Test binaries live one directory below the build output, so the
    /// parent directory is probed as well.
    pub fn discover() -> Result<Self, ExecutionFault> {
        Ok(Self {
            worker_path: locate_worker()?,
        })
    }

    /// Use an explicitly provided worker executable.
    pub fn with_worker_path(worker_path: PathBuf) -> Self {
        Self { worker_path }
    }

    /// Run one test case in a fresh worker process.
    ///
    /// Returns within `deadline_ms` plus the termination grace. The caller's
    /// test case crosses the boundary by serialization and cannot be
    /// mutated by the child. `Err` means the worker could not deliver an
    /// outcome at all (spawn failure, crash, malformed reply) — fatal for
    /// the suite.
    pub fn run_one(
        &self,
        source: &str,
        test_case: &TestCase,
        entry_point: &str,
        deadline_ms: u64,
        memory_hint_mb: Option<u64>,
    ) -> Result<CaseOutcome, ExecutionFault> {
        let payload = WorkerPayload {
            source: source.to_owned(),
            input: test_case.input.clone(),
            entry_point: entry_point.to_owned(),
            memory_hint_mb,
        };
        let payload_json = serde_json::to_string(&payload).map_err(|err| {
            ExecutionFault::WorkerCrashed {
                detail: format!("payload encoding failed: {err}"),
            }
        })?;

        debug!(worker = %self.worker_path.display(), deadline_ms, "spawning worker");
        let child = Command::new(&self.worker_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| ExecutionFault::WorkerCrashed {
                detail: format!(
                    "failed to spawn worker '{}': {err}",
                    self.worker_path.display()
                ),
            })?;
        let mut guard = WorkerChild::new(child);

        // Hand over the payload; dropping stdin closes the pipe so the
        // worker's read-to-end completes.
        if let Some(mut stdin) = guard.child.stdin.take() {
            let _ = stdin.write_all(payload_json.as_bytes());
        }

        // Drain stdout on a side thread so a chatty child can never fill the
        // pipe and block while the supervisor is waiting on it.
        let mut stdout = guard
            .child
            .stdout
            .take()
            .ok_or_else(|| ExecutionFault::WorkerCrashed {
                detail: "worker stdout was not captured".to_string(),
            })?;
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf);
            buf
        });

        let waited = guard
            .child
            .wait_timeout(Duration::from_millis(deadline_ms))
            .map_err(|err| ExecutionFault::WorkerCrashed {
                detail: format!("failed to wait on worker: {err}"),
            })?;

        match waited {
            Some(status) => {
                guard.mark_reaped();
                let raw = reader.join().unwrap_or_default();
                if raw.trim().is_empty() {
                    return Err(ExecutionFault::WorkerCrashed {
                        detail: format!("no outcome (exit status: {status})"),
                    });
                }
                let reply: WorkerReply = serde_json::from_str(raw.trim()).map_err(|err| {
                    ExecutionFault::WorkerCrashed {
                        detail: format!("malformed outcome: {err}"),
                    }
                })?;
                if !reply.stdout.is_empty() || !reply.stderr.is_empty() {
                    debug!(
                        stdout_len = reply.stdout.len(),
                        stderr_len = reply.stderr.len(),
                        "worker captured user output"
                    );
                }
                Ok(CaseOutcome::Finished(reply))
            }
            None => {
                warn!(deadline_ms, "worker exceeded deadline; terminating");
                guard.terminate();
                let _ = reader.join();
                Ok(CaseOutcome::TimedOut { deadline_ms })
            }
        }
    }
}

// ── Child ownership ──────────────────────────────────────────────────────────

/// A worker child that is guaranteed to be reaped exactly once.
struct WorkerChild {
    child: Child,
    reaped: bool,
}

impl WorkerChild {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    /// The child exited on its own and `wait_timeout` already reaped it.
    fn mark_reaped(&mut self) {
        self.reaped = true;
    }

    /// Kill, allow a grace interval, then kill again and reap.
    ///
    /// Safe to call after the child has already exited; every step tolerates
    /// an absent process.
    fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        let _ = self.child.kill();
        match self.child.wait_timeout(TERMINATION_GRACE) {
            Ok(Some(_)) => {}
            _ => {
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
        }
        self.reaped = true;
    }
}

impl Drop for WorkerChild {
    fn drop(&mut self) {
        self.terminate();
    }
}

// ── Worker discovery ─────────────────────────────────────────────────────────

fn locate_worker() -> Result<PathBuf, ExecutionFault> {
    let current = std::env::current_exe().map_err(|err| ExecutionFault::WorkerCrashed {
        detail: format!("cannot resolve current executable: {err}"),
    })?;
    let file_name = format!("{WORKER_BIN}{}", std::env::consts::EXE_SUFFIX);

    let mut dirs = Vec::new();
    if let Some(dir) = current.parent() {
        dirs.push(dir.to_path_buf());
        if let Some(parent) = dir.parent() {
            dirs.push(parent.to_path_buf());
        }
    }
    for dir in &dirs {
        let candidate = dir.join(&file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(ExecutionFault::WorkerCrashed {
        detail: format!(
            "worker executable '{file_name}' not found near '{}'",
            current.display()
        ),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
