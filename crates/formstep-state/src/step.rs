//! Step keys (`step{N}`) and the derived step-number set.

use crate::error::{FormError, FormResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated step key of the form `step{N}`.
///
/// Keys order by their step number. The string form is both the wire format
/// inside persisted documents and the addressing scheme of all public
/// operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepKey(u32);

impl StepKey {
    /// Build the key for a step number.
    #[inline]
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Parse a `step{N}` string; anything else is a configuration error.
    pub fn parse(key: &str) -> FormResult<Self> {
        let digits = key.strip_prefix("step").ok_or_else(|| FormError::InvalidStepKey {
            key: key.to_owned(),
        })?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormError::InvalidStepKey {
                key: key.to_owned(),
            });
        }
        let number = digits.parse().map_err(|_| FormError::InvalidStepKey {
            key: key.to_owned(),
        })?;
        Ok(Self(number))
    }

    /// The step number.
    #[inline]
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step{}", self.0)
    }
}

impl FromStr for StepKey {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKey::parse(s)
    }
}

impl Serialize for StepKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StepKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        StepKey::parse(&s).map_err(de::Error::custom)
    }
}

/// Rendering shapes for the step-number set, used to generate
/// human-readable validation messages and type hints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetFormat {
    /// `'1' | '2'`
    QuotedUnion,
    /// `1 | 2`
    NumberUnion,
    /// `["1", "2"]`
    StringArray,
}

/// The sorted set of step numbers with first/last metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepSet {
    numbers: Vec<u32>,
}

impl StepSet {
    /// Build from step numbers; sorted and deduplicated. An empty set is a
    /// configuration error.
    pub fn new(mut numbers: Vec<u32>) -> FormResult<Self> {
        if numbers.is_empty() {
            return Err(FormError::EmptySelection);
        }
        numbers.sort_unstable();
        numbers.dedup();
        Ok(Self { numbers })
    }

    /// The minimum step number.
    #[inline]
    pub fn first(&self) -> u32 {
        self.numbers[0]
    }

    /// The maximum step number.
    #[inline]
    pub fn last(&self) -> u32 {
        self.numbers[self.numbers.len() - 1]
    }

    /// The sorted step numbers.
    #[inline]
    pub fn value(&self) -> &[u32] {
        &self.numbers
    }

    /// The number of steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// True if the number names a live step.
    pub fn is_valid_step_number(&self, number: u32) -> bool {
        self.numbers.binary_search(&number).is_ok()
    }

    /// True if the string is a well-formed key naming a live step.
    pub fn is_valid_step_key(&self, key: &str) -> bool {
        StepKey::parse(key)
            .map(|k| self.is_valid_step_number(k.number()))
            .unwrap_or(false)
    }

    /// The live step keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.numbers.iter().map(|n| StepKey::new(*n).to_string()).collect()
    }

    /// Render the set in the requested shape.
    pub fn render(&self, format: SetFormat) -> String {
        match format {
            SetFormat::QuotedUnion => self
                .numbers
                .iter()
                .map(|n| format!("'{n}'"))
                .collect::<Vec<_>>()
                .join(" | "),
            SetFormat::NumberUnion => self
                .numbers
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
            SetFormat::StringArray => {
                let items = self
                    .numbers
                    .iter()
                    .map(|n| format!("\"{n}\""))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{items}]")
            }
        }
    }
}
