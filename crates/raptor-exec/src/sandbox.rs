//! The restricted global environment handed to user code.
//!
//! User code runs with a fresh globals dict as its *entire* world: the dict
//! holds the whitelisted builtins below and binds `__builtins__` to itself,
//! so builtin-table resolution inside the VM lands back in the same
//! restricted table instead of the real builtin module. Names outside the
//! whitelist fail with `NameError` at use time.
//!
//! The import statement is the one path that does not resolve through the
//! scope: RustPython routes it through `builtins.__import__` on the
//! interpreter itself. [`install_import_guard`] overrides that slot with a
//! function that unconditionally raises `ImportError`, which closes the path
//! for every module. The interpreter is fresh per worker process and
//! discarded with it, so mutating its builtin module is safe.

use rustpython_vm::function::FuncArgs;
use rustpython_vm::scope::Scope;
use rustpython_vm::{PyObjectRef, PyResult, VirtualMachine};

/// Names user code is allowed to resolve, and nothing else.
///
/// Grouped as: type constructors, general-purpose functions, exception
/// classes, and literal constants. File/network/process access, dynamic
/// import, and frame introspection are deliberately absent.
pub const SANDBOX_BUILTINS: &[&str] = &[
    // constructors
    "bool",
    "int",
    "float",
    "complex",
    "str",
    "bytes",
    "bytearray",
    "list",
    "tuple",
    "set",
    "frozenset",
    "dict",
    "range",
    "type",
    // functions
    "abs",
    "all",
    "any",
    "bin",
    "hex",
    "oct",
    "chr",
    "ord",
    "divmod",
    "enumerate",
    "filter",
    "format",
    "hash",
    "id",
    "isinstance",
    "issubclass",
    "iter",
    "len",
    "map",
    "max",
    "min",
    "next",
    "pow",
    "print",
    "repr",
    "reversed",
    "round",
    "sorted",
    "sum",
    "zip",
    // exceptions
    "Exception",
    "ValueError",
    "TypeError",
    "KeyError",
    "IndexError",
    "AttributeError",
    "RuntimeError",
    "StopIteration",
    "ZeroDivisionError",
    // constants
    "True",
    "False",
    "None",
];

/// Interpreter machinery copied into the table alongside the whitelist.
/// `__build_class__` is what the `class` statement compiles to; it grants no
/// ambient authority.
const SCOPE_MACHINERY: &[&str] = &["__build_class__"];

/// Build the scope user code executes in.
///
/// The globals dict is populated from the interpreter's builtin module,
/// restricted to [`SANDBOX_BUILTINS`], with `__builtins__` bound to the dict
/// itself. Whitelist names the interpreter does not provide are skipped.
pub(crate) fn build_sandbox_scope(vm: &VirtualMachine) -> PyResult<Scope> {
    let globals = vm.ctx.new_dict();
    for name in SANDBOX_BUILTINS.iter().chain(SCOPE_MACHINERY) {
        if let Ok(obj) = vm.builtins.get_attr(*name, vm) {
            globals.set_item(*name, obj, vm)?;
        }
    }
    globals.set_item("__name__", vm.ctx.new_str("__main__").into(), vm)?;
    // Self-referential builtin table: resolution through __builtins__ stays
    // inside the sandbox.
    globals.set_item("__builtins__", globals.clone().into(), vm)?;
    Ok(Scope::with_builtins(None, globals, vm))
}

/// Replace `builtins.__import__` with an unconditional rejection.
///
/// Installed once per worker interpreter, before any user code runs.
pub(crate) fn install_import_guard(vm: &VirtualMachine) {
    let guard = vm.new_function(
        "__import__",
        move |args: FuncArgs, vm: &VirtualMachine| -> PyResult<PyObjectRef> {
            let module = args
                .args
                .first()
                .and_then(|name| name.str(vm).ok())
                .map(|name| name.as_str().to_owned())
                .unwrap_or_default();
            Err(vm.new_import_error(
                format!("import of '{module}' is not permitted in the sandbox"),
                vm.ctx.new_str(module),
            ))
        },
    );
    let _ = vm.builtins.set_attr("__import__", guard, vm);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_has_no_dangerous_names() {
        for denied in ["open", "exec", "eval", "compile", "__import__", "input", "globals", "locals", "vars", "getattr", "setattr", "delattr", "memoryview", "breakpoint"] {
            assert!(
                !SANDBOX_BUILTINS.contains(&denied),
                "'{denied}' must not be whitelisted"
            );
        }
    }

    #[test]
    fn test_whitelist_covers_required_capabilities() {
        for required in ["int", "float", "str", "list", "dict", "len", "print", "range", "ZeroDivisionError", "StopIteration"] {
            assert!(
                SANDBOX_BUILTINS.contains(&required),
                "'{required}' missing from the whitelist"
            );
        }
    }

    #[test]
    fn test_whitelist_is_duplicate_free() {
        let mut names: Vec<&str> = SANDBOX_BUILTINS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SANDBOX_BUILTINS.len());
    }
}
