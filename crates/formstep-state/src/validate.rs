//! Validator adapter.
//!
//! Callers register validators in several conventions (plain transform
//! functions, parse-or-fail functions, standard-schema style `validate`).
//! Each convention is normalized into one capability — `run(input) ->
//! value | error` — at registration time, so the engine never sniffs call
//! shapes. Validation is synchronous by construction: the adapter's
//! function type has no async form.

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A single validation finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Human-readable description.
    pub message: String,
    /// Dotted path of the offending input, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Issue {
    /// Create an issue with no path.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Create an issue at a dotted path.
    pub fn at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

/// Issue list wrapper whose `Display` serializes the raw issues, so error
/// messages carry the full finding list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueList(pub Vec<Issue>);

impl fmt::Display for IssueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} issue(s)", self.0.len()),
        }
    }
}

/// The result of running a validator.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Validation succeeded, possibly transforming the input.
    Value(Value),
    /// Validation failed with findings.
    Issues(Vec<Issue>),
}

type RunFn = dyn Fn(&Value) -> Outcome + Send + Sync;

/// A registered synchronous validator.
///
/// Cloning shares the underlying function.
#[derive(Clone)]
pub struct Validator {
    run: Arc<RunFn>,
}

impl Validator {
    /// Adapt a plain transform function: the returned value is the
    /// validated output, and the function itself cannot fail.
    pub fn from_fn(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            run: Arc::new(move |input| Outcome::Value(f(input))),
        }
    }

    /// Adapt a parse-style function that either returns the coerced value
    /// or fails with a message.
    pub fn from_parser(f: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static) -> Self {
        Self {
            run: Arc::new(move |input| match f(input) {
                Ok(value) => Outcome::Value(value),
                Err(message) => Outcome::Issues(vec![Issue::new(message)]),
            }),
        }
    }

    /// Adapt a standard-schema style validate function that reports an
    /// [`Outcome`] directly.
    pub fn standard(f: impl Fn(&Value) -> Outcome + Send + Sync + 'static) -> Self {
        Self { run: Arc::new(f) }
    }

    /// Run the validator. Issues become [`FormError::Validation`].
    pub fn run(&self, input: &Value) -> FormResult<Value> {
        match (self.run)(input) {
            Outcome::Value(value) => Ok(value),
            Outcome::Issues(issues) => Err(FormError::Validation {
                issues: IssueList(issues),
            }),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}
