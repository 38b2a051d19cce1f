//! Type-aware equality between an actual and an expected [`Value`].
//!
//! Rules, applied in order:
//! 1. Two floats are equal when their absolute difference is below
//!    [`FLOAT_TOLERANCE`]. NaN compares unequal to everything, itself
//!    included. An int next to a float joins this rule (the source language
//!    treats `10 == 10.0` as true).
//! 2. Two ordered sequences are equal when they have the same length and all
//!    paired elements are equal. A list on one side and a tuple on the other
//!    still match under this rule.
//! 3. Two mappings are equal when their key sets match and every key's values
//!    are equal.
//! 4. Everything else falls back to exact equality; remaining cross-type
//!    pairs are unequal.

use std::collections::BTreeMap;

use crate::value::Value;

/// Absolute tolerance for floating-point comparison.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// Decide whether `actual` matches `expected`.
///
/// Pure and recursive; neither side is mutated.
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Float(a), Value::Float(b)) => floats_equal(*a, *b),
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
            floats_equal(*i as f64, *f)
        }
        (Value::List(a) | Value::Tuple(a), Value::List(b) | Value::Tuple(b)) => {
            sequences_equal(a, b)
        }
        (Value::Map(a), Value::Map(b)) => mappings_equal(a, b),
        (a, b) => a == b,
    }
}

fn floats_equal(a: f64, b: f64) -> bool {
    // NaN on either side makes the difference NaN, which fails the test.
    (a - b).abs() < FLOAT_TOLERANCE
}

fn sequences_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
}

fn mappings_equal(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, va)| b.get(key).is_some_and(|vb| values_equal(va, vb)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
