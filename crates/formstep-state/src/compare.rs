//! Deep structural comparison at a set of paths.
//!
//! The update engine must guarantee that a caller-supplied partial update
//! cannot silently change the *shape* of a step's data while still freely
//! allowing *value* changes. `compare_at_paths` enforces exactly that: by
//! default a report is `ok` when it contains no structural findings, and a
//! same-type different-value finding is recorded but tolerated.

use crate::error::{FormError, FormResult};
use crate::path::{normalize_paths, read_at_many, Path};
use serde_json::Value;
use std::fmt;

/// Why an expected/actual pair diverged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchReason {
    /// Same type and shape, different value. Tolerated by default.
    ValueMismatch,
    /// Different JSON types.
    TypeMismatch,
    /// A key or element present in the expected value is absent.
    MissingKey,
    /// A key or element absent from the expected value is present.
    ExtraKey,
}

impl MismatchReason {
    /// True for findings that change the shape of the data.
    pub fn is_structural(&self) -> bool {
        !matches!(self, MismatchReason::ValueMismatch)
    }
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MismatchReason::ValueMismatch => "value-mismatch",
            MismatchReason::TypeMismatch => "type-mismatch",
            MismatchReason::MissingKey => "missing-key",
            MismatchReason::ExtraKey => "extra-key",
        })
    }
}

/// A single point of divergence between expected and actual values.
///
/// The expected side is summarized by type only, so large configured
/// defaults never leak into error messages.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    /// Where the divergence occurred, relative to the compared slice.
    pub path: Path,
    /// Type summary of the expected value.
    pub expected: &'static str,
    /// The actual value found.
    pub actual: Value,
    /// The kind of divergence.
    pub reason: MismatchReason,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {path}: {reason} (expected {expected}, got {actual})",
            path = if self.path.is_empty() {
                "(root)".to_owned()
            } else {
                self.path.to_string()
            },
            reason = self.reason,
            expected = self.expected,
            actual = self.actual,
        )
    }
}

/// The outcome of a structural comparison.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompareReport {
    /// All findings, structural and value-level.
    pub mismatches: Vec<Mismatch>,
}

impl CompareReport {
    /// True when no *structural* mismatch was found. Value changes at
    /// matching shape are allowed.
    pub fn ok(&self) -> bool {
        !self.mismatches.iter().any(|m| m.reason.is_structural())
    }

    /// True when expected and actual are deeply equal.
    pub fn strict_ok(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Only the structural findings.
    pub fn structural(&self) -> Vec<&Mismatch> {
        self.mismatches
            .iter()
            .filter(|m| m.reason.is_structural())
            .collect()
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let structural = self.structural();
        write!(f, "{} structural issue(s)", structural.len())?;
        for m in structural {
            write!(f, "; {m}")?;
        }
        Ok(())
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compare two values structurally, reporting mismatches relative to the
/// root of the pair.
pub fn compare_values(expected: &Value, actual: &Value) -> CompareReport {
    let mut mismatches = Vec::new();
    compare_rec(&Path::root(), expected, actual, &mut mismatches);
    CompareReport { mismatches }
}

/// Compare the value read from `expected_root` at the (ancestor-normalized)
/// `paths` against the caller-supplied `actual_slice`.
///
/// Fails with [`FormError::PathNotFound`] if a normalized path is absent
/// from `expected_root`, and [`FormError::EmptySelection`] for an empty
/// path set.
pub fn compare_at_paths(
    expected_root: &Value,
    paths: &[Path],
    actual_slice: &Value,
) -> FormResult<CompareReport> {
    let normalized = normalize_paths(paths);
    if normalized.is_empty() {
        return Err(FormError::EmptySelection);
    }
    for path in &normalized {
        if crate::path::read_at(expected_root, path).is_none() {
            return Err(FormError::path_not_found(path.clone()));
        }
    }

    let expected = read_at_many(expected_root, &normalized)
        .ok_or_else(|| FormError::path_not_found(normalized[0].clone()))?;

    // A single normalized path compares relative to that path; multiple
    // paths compare the reconstructed root-shaped slice.
    let base = match normalized.as_slice() {
        [single] => single.clone(),
        _ => Path::root(),
    };

    let mut mismatches = Vec::new();
    compare_rec(&base, &expected, actual_slice, &mut mismatches);
    Ok(CompareReport { mismatches })
}

fn compare_rec(path: &Path, expected: &Value, actual: &Value, out: &mut Vec<Mismatch>) {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            for (key, exp_child) in exp {
                match act.get(key) {
                    Some(act_child) => {
                        compare_rec(&path.clone().key(key), exp_child, act_child, out)
                    }
                    None => out.push(Mismatch {
                        path: path.clone().key(key),
                        expected: value_type_name(exp_child),
                        actual: Value::Null,
                        reason: MismatchReason::MissingKey,
                    }),
                }
            }
            for (key, act_child) in act {
                if !exp.contains_key(key) {
                    out.push(Mismatch {
                        path: path.clone().key(key),
                        expected: "absent",
                        actual: act_child.clone(),
                        reason: MismatchReason::ExtraKey,
                    });
                }
            }
        }
        (Value::Array(exp), Value::Array(act)) => {
            for (i, exp_item) in exp.iter().enumerate() {
                match act.get(i) {
                    Some(act_item) => {
                        compare_rec(&path.clone().index(i), exp_item, act_item, out)
                    }
                    None => out.push(Mismatch {
                        path: path.clone().index(i),
                        expected: value_type_name(exp_item),
                        actual: Value::Null,
                        reason: MismatchReason::MissingKey,
                    }),
                }
            }
            for (i, act_item) in act.iter().enumerate().skip(exp.len()) {
                out.push(Mismatch {
                    path: path.clone().index(i),
                    expected: "absent",
                    actual: act_item.clone(),
                    reason: MismatchReason::ExtraKey,
                });
            }
        }
        _ => {
            if value_type_name(expected) != value_type_name(actual) {
                out.push(Mismatch {
                    path: path.clone(),
                    expected: value_type_name(expected),
                    actual: actual.clone(),
                    reason: MismatchReason::TypeMismatch,
                });
            } else if expected != actual {
                out.push(Mismatch {
                    path: path.clone(),
                    expected: value_type_name(expected),
                    actual: actual.clone(),
                    reason: MismatchReason::ValueMismatch,
                });
            }
        }
    }
}
