//! RustPython VM lifecycle for the worker process.
//!
//! This module owns all RustPython API calls on the worker side. For one test
//! case it:
//! - Creates a fresh stdlib-free interpreter (the sandbox forbids imports, so
//!   no module registry is needed).
//! - Installs the import guard and replaces `sys.stdout`/`sys.stderr` with
//!   capture writers so the process's real stdout stays reserved for the
//!   reply protocol.
//! - Compiles and evaluates the submission inside the sandbox scope.
//! - Resolves the entry point, invokes it with the test input as keyword
//!   arguments, and converts the returned object into a [`Value`] tree.
//!
//! Errors are extracted into [`ExecutionFault`] variants; the exception class
//! name and message become the user-visible diagnostic. This file contains no
//! `unsafe` code.

use std::time::Instant;

use rustpython_vm::builtins::PyBaseExceptionRef;
use rustpython_vm::compiler::Mode;
use rustpython_vm::function::{FuncArgs, KwArgs};
use rustpython_vm::{
    AsObject, Interpreter, PyObjectRef, PyResult, Settings, TryFromObject, VirtualMachine,
};

use crate::output::{CaptureBuffer, StreamKind};
use crate::sandbox::{build_sandbox_scope, install_import_guard};
use crate::syntax::syntax_fault;
use crate::types::ExecutionFault;
use crate::value::Value;
use crate::worker::{WorkerOutcome, WorkerPayload, WorkerReply};

/// Budget for captured user stdout+stderr.
const CAPTURE_BUDGET_BYTES: usize = 1_048_576;

/// Conversion depth cap for entry-point return values. Self-referential
/// containers would otherwise recurse forever.
const MAX_VALUE_DEPTH: usize = 64;

/// Execute one test case inside a fresh interpreter.
pub(crate) fn run_case(payload: &WorkerPayload) -> WorkerReply {
    let capture = CaptureBuffer::new(CAPTURE_BUDGET_BYTES);
    let interp = Interpreter::without_stdlib(Settings::default());

    let outcome = interp.enter(|vm| {
        install_import_guard(vm);
        install_stream_capture(vm, capture.clone());

        let scope = match build_sandbox_scope(vm) {
            Ok(scope) => scope,
            Err(exc) => return WorkerOutcome::Failed { fault: runtime_fault(vm, exc) },
        };

        // Compile; the validator uses this same front end, so anything that
        // slips past it still fails identically here.
        let code = match vm.compile(&payload.source, Mode::Exec, "<submission>".to_owned()) {
            Ok(code) => code,
            Err(err) => return WorkerOutcome::Failed { fault: syntax_fault(&err) },
        };

        // Evaluate the module body: definitions land in the sandbox globals.
        if let Err(exc) = vm.run_code_obj(code, scope.clone()) {
            return WorkerOutcome::Failed { fault: runtime_fault(vm, exc) };
        }

        // Entry-point lookup, dict protocol. Absent or None means the
        // submission never defined it.
        let globals: PyObjectRef = scope.globals.clone().into();
        let entry = match vm.call_method(&globals, "get", (vm.ctx.new_str(payload.entry_point.as_str()),)) {
            Ok(obj) if !vm.is_none(&obj) => obj,
            _ => {
                return WorkerOutcome::Failed {
                    fault: ExecutionFault::MissingEntry {
                        name: payload.entry_point.clone(),
                    },
                }
            }
        };

        let kwargs = match build_kwargs(payload, vm) {
            Ok(kwargs) => kwargs,
            Err(exc) => return WorkerOutcome::Failed { fault: runtime_fault(vm, exc) },
        };

        let started = Instant::now();
        let invoked = entry.call(FuncArgs::new(Vec::<PyObjectRef>::new(), kwargs), vm);
        let elapsed_ms = elapsed_whole_ms(started);

        match invoked {
            Ok(returned) => match py_to_value(&returned, vm, 0) {
                Ok(actual) => WorkerOutcome::Completed { actual, elapsed_ms },
                Err(exc) => WorkerOutcome::Failed { fault: runtime_fault(vm, exc) },
            },
            Err(exc) => WorkerOutcome::Failed { fault: runtime_fault(vm, exc) },
        }
    });

    let (stdout, stderr) = capture.snapshot();
    WorkerReply {
        outcome,
        stdout,
        stderr,
    }
}

/// Monotonic elapsed time rounded to the nearest whole millisecond.
fn elapsed_whole_ms(started: Instant) -> u64 {
    (started.elapsed().as_secs_f64() * 1_000.0).round().max(0.0) as u64
}

/// Convert the payload's input mapping into keyword arguments.
fn build_kwargs(payload: &WorkerPayload, vm: &VirtualMachine) -> PyResult<KwArgs> {
    let mut pairs = Vec::with_capacity(payload.input.len());
    for (name, value) in &payload.input {
        pairs.push((name.clone(), value_to_py(value, vm)?));
    }
    Ok(pairs.into_iter().collect())
}

// ── Stream capture ────────────────────────────────────────────────────────────

/// Point `sys.stdout` and `sys.stderr` at capture writers.
fn install_stream_capture(vm: &VirtualMachine, capture: CaptureBuffer) {
    let stdout = build_capture_writer(vm, capture.clone(), StreamKind::Stdout);
    let stderr = build_capture_writer(vm, capture, StreamKind::Stderr);
    let _ = vm.sys_module.set_attr("stdout", stdout, vm);
    let _ = vm.sys_module.set_attr("stderr", stderr, vm);
}

/// A minimal file-like object whose `write` lands in the capture buffer.
///
/// `print()` calls `sys.stdout.write(s)` then `write('\n')`, so this is all
/// the surface the VM needs.
fn build_capture_writer(
    vm: &VirtualMachine,
    capture: CaptureBuffer,
    stream: StreamKind,
) -> PyObjectRef {
    let write_fn = vm.new_function(
        "write",
        move |args: FuncArgs, vm: &VirtualMachine| -> PyResult<PyObjectRef> {
            let text = args
                .args
                .first()
                .and_then(|obj| obj.str(vm).ok())
                .map(|s| s.as_str().to_owned())
                .unwrap_or_default();
            capture.push(stream, &text);
            Ok(vm.ctx.new_int(text.len()).into())
        },
    );
    let flush_fn = vm.new_function(
        "flush",
        move |_args: FuncArgs, vm: &VirtualMachine| -> PyResult<PyObjectRef> {
            Ok(vm.ctx.none())
        },
    );

    let writer = vm.new_module("<capture>", vm.ctx.new_dict(), None);
    let _ = writer.set_attr("write", write_fn, vm);
    let _ = writer.set_attr("flush", flush_fn, vm);
    let _ = writer.set_attr("closed", vm.ctx.new_bool(false), vm);
    let _ = writer.set_attr("encoding", vm.ctx.new_str("utf-8"), vm);
    writer.into()
}

// ── Fault extraction ──────────────────────────────────────────────────────────

/// Exception class name plus message, e.g. `ZeroDivisionError` /
/// `"division by zero"`.
fn runtime_fault(vm: &VirtualMachine, exc: PyBaseExceptionRef) -> ExecutionFault {
    let class: PyObjectRef = exc.as_object().class().to_owned().into();
    let exception = class
        .get_attr("__name__", vm)
        .ok()
        .and_then(|name| name.str(vm).ok())
        .map(|name| name.as_str().to_owned())
        .unwrap_or_else(|| "Exception".to_owned());

    let message = exc
        .as_object()
        .str(vm)
        .map(|s| s.as_str().to_owned())
        .unwrap_or_default();

    ExecutionFault::Runtime { exception, message }
}

// ── Value conversion ──────────────────────────────────────────────────────────

/// Build the Python object for a [`Value`].
fn value_to_py(value: &Value, vm: &VirtualMachine) -> PyResult<PyObjectRef> {
    Ok(match value {
        Value::Unit => vm.ctx.none(),
        Value::Bool(b) => vm.ctx.new_bool(*b).into(),
        Value::Int(i) => vm.ctx.new_int(*i).into(),
        Value::Float(f) => vm.ctx.new_float(*f).into(),
        Value::Str(s) => vm.ctx.new_str(s.as_str()).into(),
        Value::List(items) => {
            let elements = items
                .iter()
                .map(|item| value_to_py(item, vm))
                .collect::<PyResult<Vec<_>>>()?;
            vm.ctx.new_list(elements).into()
        }
        Value::Tuple(items) => {
            let elements = items
                .iter()
                .map(|item| value_to_py(item, vm))
                .collect::<PyResult<Vec<_>>>()?;
            vm.ctx.new_tuple(elements).into()
        }
        Value::Map(entries) => {
            let dict = vm.ctx.new_dict();
            for (key, val) in entries {
                dict.set_item(key.as_str(), value_to_py(val, vm)?, vm)?;
            }
            dict.into()
        }
    })
}

/// Convert an arbitrary Python object into the closed [`Value`] repertoire.
///
/// Values with no counterpart (sets, objects, out-of-range integers) degrade
/// to their textual form; mapping keys go through `str()`.
fn py_to_value(obj: &PyObjectRef, vm: &VirtualMachine, depth: usize) -> PyResult<Value> {
    if depth > MAX_VALUE_DEPTH {
        return Err(vm.new_runtime_error("return value nesting is too deep".to_owned()));
    }

    if vm.is_none(obj) {
        return Ok(Value::Unit);
    }

    // bool first: it subclasses int.
    if obj.fast_isinstance(vm.ctx.types.bool_type) {
        return Ok(Value::Bool(bool::try_from_object(vm, obj.clone())?));
    }
    if obj.fast_isinstance(vm.ctx.types.int_type) {
        // Integers beyond i64 fall back to their decimal text.
        return Ok(match i64::try_from_object(vm, obj.clone()) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(obj.str(vm)?.as_str().to_owned()),
        });
    }
    if obj.fast_isinstance(vm.ctx.types.float_type) {
        return Ok(Value::Float(f64::try_from_object(vm, obj.clone())?));
    }
    if obj.fast_isinstance(vm.ctx.types.str_type) {
        return Ok(Value::Str(obj.str(vm)?.as_str().to_owned()));
    }
    if obj.fast_isinstance(vm.ctx.types.list_type) {
        let elements: Vec<PyObjectRef> = vm.extract_elements_with(obj, |o| Ok(o))?;
        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            items.push(py_to_value(element, vm, depth + 1)?);
        }
        return Ok(Value::List(items));
    }
    if obj.fast_isinstance(vm.ctx.types.tuple_type) {
        let elements: Vec<PyObjectRef> = vm.extract_elements_with(obj, |o| Ok(o))?;
        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            items.push(py_to_value(element, vm, depth + 1)?);
        }
        return Ok(Value::Tuple(items));
    }
    if obj.fast_isinstance(vm.ctx.types.dict_type) {
        let items_view = vm.call_method(obj, "items", ())?;
        let pairs: Vec<PyObjectRef> = vm.extract_elements_with(&items_view, |o| Ok(o))?;
        let mut entries = std::collections::BTreeMap::new();
        for pair in &pairs {
            let kv: Vec<PyObjectRef> = vm.extract_elements_with(pair, |o| Ok(o))?;
            if kv.len() != 2 {
                return Err(vm.new_runtime_error("malformed mapping item".to_owned()));
            }
            let key = kv[0].str(vm)?.as_str().to_owned();
            entries.insert(key, py_to_value(&kv[1], vm, depth + 1)?);
        }
        return Ok(Value::Map(entries));
    }

    // Anything else: textual representation.
    Ok(Value::Str(obj.repr(vm)?.as_str().to_owned()))
}
