//! Error types and invariant utilities.
//!
//! All failures are fatal and surfaced as [`FormError`]: configuration errors
//! at construction, selection/structural/validation errors at call time.
//! Nothing is recovered or retried inside the core.

use crate::compare::CompareReport;
use crate::path::Path;
use crate::validate::IssueList;
use std::fmt;
use thiserror::Error;

/// Result type alias for formstep operations.
pub type FormResult<T> = Result<T, FormError>;

/// Errors that can occur during schema construction and mutation.
#[derive(Debug, Error)]
pub enum FormError {
    /// A configured step key does not match `step{N}`.
    #[error("invalid step key: {key:?} (step keys must match \"step{{N}}\")")]
    InvalidStepKey {
        /// The offending key.
        key: String,
    },

    /// A step was configured with no fields.
    #[error("step {step} has an empty field set; every step requires at least one field")]
    EmptyFields {
        /// The step key.
        step: String,
    },

    /// A field validator returned a different key set than it was given.
    #[error("field validator for {step} changed the field set: missing {missing}; unexpected {extra}")]
    ValidatorKeyMismatch {
        /// The step key.
        step: String,
        /// Configured field names absent from the validator output.
        missing: KeyList,
        /// Validator output keys that were never configured.
        extra: KeyList,
    },

    /// One or more selected keys are not live keys.
    #[error("{message}")]
    InvalidKeys {
        /// The keys that were rejected.
        invalid: KeyList,
        /// The full set of valid keys.
        valid: KeyList,
        /// Formatted message (default or caller-supplied).
        message: String,
    },

    /// A selection resolved to zero targets.
    #[error("selection is empty; at least one target is required")]
    EmptySelection,

    /// A selection argument has an invalid shape.
    #[error("invalid selection: {message}")]
    InvalidSelection {
        /// What was wrong with the selection.
        message: String,
    },

    /// An updater's return value diverged structurally from the current value.
    #[error("structural mismatch: {report}")]
    ShapeMismatch {
        /// The full mismatch report.
        report: CompareReport,
    },

    /// A synchronous validator reported issues.
    #[error("validation failed: {issues}")]
    Validation {
        /// The raw issue list.
        issues: IssueList,
    },

    /// A step number outside the known step set was addressed.
    #[error("unknown step {step}; known steps are {known}")]
    UnknownStep {
        /// The requested step number.
        step: u32,
        /// The known step keys.
        known: KeyList,
    },

    /// A selected path does not exist in the current value.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The missing path.
        path: Path,
    },

    /// No key-value store was provided at construction.
    #[error("no key-value store was provided; inject a store explicitly when building the schema")]
    NoStore,

    /// The underlying store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the store failure.
        message: String,
    },

    /// A broken internal invariant.
    #[error("{0}")]
    Invariant(String),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        FormError::PathNotFound { path }
    }

    /// Create an invalid selection error.
    #[inline]
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        FormError::InvalidSelection {
            message: message.into(),
        }
    }

    /// Create a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        FormError::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid-keys error with the default message, which
    /// enumerates both the rejected keys and the valid set.
    pub fn invalid_keys(invalid: Vec<String>, valid: Vec<String>) -> Self {
        let invalid = KeyList(invalid);
        let valid = KeyList(valid);
        let message = format!("invalid keys: {invalid}; valid keys are {valid}");
        FormError::InvalidKeys {
            invalid,
            valid,
            message,
        }
    }

    /// Create an invalid-keys error with a caller-formatted message.
    ///
    /// The formatter receives both key sets and the default message.
    pub fn invalid_keys_with(
        invalid: Vec<String>,
        valid: Vec<String>,
        format: impl FnOnce(&[String], &[String], &str) -> String,
    ) -> Self {
        let default = format!(
            "invalid keys: {}; valid keys are {}",
            KeyList(invalid.clone()),
            KeyList(valid.clone())
        );
        let message = format(&invalid, &valid, &default);
        FormError::InvalidKeys {
            invalid: KeyList(invalid),
            valid: KeyList(valid),
            message,
        }
    }
}

/// Throw `FormError::Invariant` with a lazily-formatted message when the
/// condition is false. The message closure only runs on failure.
#[inline]
pub fn invariant(condition: bool, message: impl FnOnce() -> String) -> FormResult<()> {
    if condition {
        Ok(())
    } else {
        Err(FormError::Invariant(message()))
    }
}

/// A list of keys, displayed with natural-language joining ("a, b, and c").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyList(pub Vec<String>);

impl fmt::Display for KeyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_natural(&self.0))
    }
}

/// Join items into a natural-language list: "a", "a and b", "a, b, and c".
pub fn join_natural(items: &[String]) -> String {
    match items {
        [] => "(none)".to_owned(),
        [one] => one.clone(),
        [a, b] => format!("{a} and {b}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}
