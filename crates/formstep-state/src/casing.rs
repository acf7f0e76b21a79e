//! Casing transformation for deriving display labels from field names.
//!
//! Field names like `firstName` or `billing_address` are normalized into
//! lowercase word tokens and re-joined per the requested casing. The
//! transformation is pure and total.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named casing strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Casing {
    /// `First name`
    Sentence,
    /// `First Name` (the schema-wide default)
    #[default]
    Title,
    /// `firstName`
    Camel,
    /// `first name`
    Lower,
    /// `FIRST NAME`
    Upper,
    /// `FirstName`
    Pascal,
    /// `first_name`
    Snake,
    /// `FIRST_NAME`
    ScreamingSnake,
    /// `first-name`
    Kebab,
    /// `firstname`
    Flat,
}

impl Casing {
    /// Parse a casing name. Returns `None` for unrecognized names; config
    /// loading falls back to the default (`Title`) in that case.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "sentence" => Casing::Sentence,
            "title" => Casing::Title,
            "camel" => Casing::Camel,
            "lower" => Casing::Lower,
            "upper" => Casing::Upper,
            "pascal" => Casing::Pascal,
            "snake" => Casing::Snake,
            "screaming-snake" => Casing::ScreamingSnake,
            "kebab" => Casing::Kebab,
            "flat" => Casing::Flat,
            _ => return None,
        })
    }

    /// The canonical name of this casing.
    pub fn name(&self) -> &'static str {
        match self {
            Casing::Sentence => "sentence",
            Casing::Title => "title",
            Casing::Camel => "camel",
            Casing::Lower => "lower",
            Casing::Upper => "upper",
            Casing::Pascal => "pascal",
            Casing::Snake => "snake",
            Casing::ScreamingSnake => "screaming-snake",
            Casing::Kebab => "kebab",
            Casing::Flat => "flat",
        }
    }
}

impl fmt::Display for Casing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split an input into lowercase word tokens.
///
/// A boundary is inserted between a lowercase-then-uppercase letter pair
/// (camelCase boundary), runs of `-`/`_` collapse to a single space, and the
/// result is trimmed and split on whitespace.
fn tokenize(input: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(input.len() + 8);
    let mut prev_lower = false;

    for ch in input.chars() {
        if ch == '-' || ch == '_' {
            spaced.push(' ');
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = ch.is_lowercase();
        spaced.push(ch);
    }

    spaced
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Transform `input` into the given casing (pure function).
///
/// # Examples
///
/// ```
/// use formstep_state::{change_casing, Casing};
///
/// assert_eq!(change_casing("firstName", Casing::Title), "First Name");
/// assert_eq!(change_casing("firstName", Casing::Kebab), "first-name");
/// assert_eq!(change_casing("billing_address", Casing::Camel), "billingAddress");
/// ```
pub fn change_casing(input: &str, casing: Casing) -> String {
    let words = tokenize(input);

    match casing {
        Casing::Sentence => {
            let mut out = words;
            if let Some(first) = out.first_mut() {
                *first = capitalize(first);
            }
            out.join(" ")
        }
        Casing::Title => words
            .iter()
            .map(|w| capitalize(w))
            .collect::<Vec<_>>()
            .join(" "),
        Casing::Camel => {
            let mut out = String::new();
            for (i, w) in words.iter().enumerate() {
                if i == 0 {
                    out.push_str(w);
                } else {
                    out.push_str(&capitalize(w));
                }
            }
            out
        }
        Casing::Lower => words.join(" "),
        Casing::Upper => words
            .iter()
            .map(|w| w.to_uppercase())
            .collect::<Vec<_>>()
            .join(" "),
        Casing::Pascal => words.iter().map(|w| capitalize(w)).collect(),
        Casing::Snake => words.join("_"),
        Casing::ScreamingSnake => words
            .iter()
            .map(|w| w.to_uppercase())
            .collect::<Vec<_>>()
            .join("_"),
        Casing::Kebab => words.join("-"),
        Casing::Flat => words.concat(),
    }
}

/// Transform `input` by casing name.
///
/// An unrecognized name returns the input unchanged rather than failing.
/// This fallback is intentional compatibility behavior, not an error path.
pub fn change_casing_by_name(input: &str, name: &str) -> String {
    match Casing::parse(name) {
        Some(casing) => change_casing(input, casing),
        None => input.to_owned(),
    }
}
