//! Entry-point extraction from function signature strings.
//!
//! Problem definitions describe the expected solution as a signature such as
//! `def solution(nums: List[int]) -> int:`. The runner only needs the
//! identifier after the definition keyword.

use once_cell::sync::Lazy;
use regex::Regex;

/// Entry-point name used when no identifier can be extracted.
pub const DEFAULT_ENTRY_POINT: &str = "solution";

/// First identifier following the `def` keyword, up to the opening paren.
static SIGNATURE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

/// Extract the function name from `signature`, falling back to
/// [`DEFAULT_ENTRY_POINT`] when the string does not look like a function
/// definition. Whitespace and type annotations are tolerated.
pub fn entry_point_from_signature(signature: &str) -> String {
    SIGNATURE_PATTERN
        .captures(signature)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
