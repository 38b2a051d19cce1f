use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use raptor_exec::{
    entry_point_from_signature, run_suite, RunConfig, TestCase, Value, DEFAULT_DEADLINE_MS,
};

/// Run a submission against a test suite and emit JSON verdicts.
#[derive(Parser, Debug)]
#[command(
    name = "raptor-exec-cli",
    about = "Run a submission against a test suite and emit JSON verdicts"
)]
struct Args {
    /// Read the submission source from a file instead of stdin
    #[arg(long)]
    file: Option<PathBuf>,

    /// JSON file with an array of test cases: {"input": {...}, "expected": ...}
    #[arg(long)]
    tests: PathBuf,

    /// Entry-point function name (takes precedence over --signature)
    #[arg(long)]
    entry: Option<String>,

    /// Function signature to extract the entry point from
    #[arg(long)]
    signature: Option<String>,

    /// Per-test deadline in milliseconds
    #[arg(long, default_value_t = DEFAULT_DEADLINE_MS)]
    deadline_ms: u64,
}

fn main() {
    let args = Args::parse();

    // Read the submission source.
    let source = if let Some(path) = &args.file {
        std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading source file: {e}");
            std::process::exit(1);
        })
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
            eprintln!("Error reading stdin: {e}");
            std::process::exit(1);
        });
        buf
    };

    // Load and convert the test cases.
    let raw_tests = std::fs::read_to_string(&args.tests).unwrap_or_else(|e| {
        eprintln!("Error reading test file: {e}");
        std::process::exit(1);
    });
    let test_cases = parse_test_cases(&raw_tests).unwrap_or_else(|e| {
        eprintln!("Error parsing test file: {e}");
        std::process::exit(1);
    });

    let entry_point = args.entry.unwrap_or_else(|| {
        entry_point_from_signature(args.signature.as_deref().unwrap_or_default())
    });
    let config = RunConfig {
        deadline_ms: args.deadline_ms,
        memory_hint_mb: None,
    };

    // Run. Always exits 0 from here on: outcomes and faults are both encoded
    // in the JSON, not the exit code.
    match run_suite(&source, &test_cases, &entry_point, &config) {
        Ok(verdict) => {
            let json = serde_json::to_string(&verdict).expect("SuiteVerdict is always serializable");
            println!("{json}");
        }
        Err(fault) => {
            let json = serde_json::to_string(&fault).expect("ExecutionFault is always serializable");
            println!("{json}");
        }
    }
}

/// Parse the loader-facing test format: plain JSON, no type tags.
fn parse_test_cases(raw: &str) -> Result<Vec<TestCase>, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    let entries = parsed
        .as_array()
        .ok_or_else(|| "expected a top-level array of test cases".to_string())?;

    let mut cases = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let object = entry
            .as_object()
            .ok_or_else(|| format!("test case {index} is not an object"))?;
        let input = object
            .get("input")
            .and_then(|v| v.as_object())
            .ok_or_else(|| format!("test case {index} is missing an 'input' object"))?
            .iter()
            .map(|(name, value)| (name.clone(), json_to_value(value)))
            .collect::<BTreeMap<_, _>>();
        let expected = object
            .get("expected")
            .map(json_to_value)
            .ok_or_else(|| format!("test case {index} is missing 'expected'"))?;

        let mut case = TestCase::new(input, expected);
        case.description = object
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        case.hidden = object.get("hidden").and_then(|v| v.as_bool()).unwrap_or(false);
        cases.push(case);
    }
    Ok(cases)
}

/// Untagged loader JSON into the core's tagged value tree. JSON cannot spell
/// tuples, so arrays become lists; the comparator treats them alike anyway.
fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Unit,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, val)| (key.clone(), json_to_value(val)))
                .collect(),
        ),
    }
}
