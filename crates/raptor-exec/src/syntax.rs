//! Submission syntax validation.
//!
//! Validation uses the same compiler front end the worker uses to execute,
//! so a submission rejected here is exactly one that would be rejected at
//! execution time, with the same line numbers. Nothing is ever executed.

use rustpython_vm::compiler::{CompileError, Mode};
use rustpython_vm::{Interpreter, Settings};

use crate::types::ExecutionFault;

/// Check that `source` parses. Returns [`ExecutionFault::Syntax`] on
/// failure; empty or whitespace-only source fails with "code is empty".
pub fn validate_syntax(source: &str) -> Result<(), ExecutionFault> {
    if source.trim().is_empty() {
        return Err(ExecutionFault::Syntax {
            line: 1,
            message: "code is empty".to_string(),
        });
    }

    // A stdlib-free interpreter is enough to drive the compiler.
    Interpreter::without_stdlib(Settings::default()).enter(|vm| {
        match vm.compile(source, Mode::Exec, "<submission>".to_owned()) {
            Ok(_) => Ok(()),
            Err(err) => Err(syntax_fault(&err)),
        }
    })
}

/// Convert a compile error into the fault variant, keeping the 1-based line
/// (0 when the compiler cannot attribute one).
pub(crate) fn syntax_fault(err: &CompileError) -> ExecutionFault {
    let (line, _col) = err.python_location();
    ExecutionFault::Syntax {
        line: line as u32,
        message: err.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
