//! Dotted paths into nested form data, plus the pure deep-access utilities
//! the update engine is built on: path enumeration, reads (single and
//! ancestor-normalized multi-path), and immutable writes.

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single segment in a path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key access.
    Key(String),
    /// Array index access (only produced when reporting per-element
    /// mismatches; dotted selections address object keys).
    Index(usize),
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// A path into nested form data.
///
/// Displayed in dotted form: `fields.firstName.defaultValue`, with array
/// indexes rendered as `tags[0]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty (root) path.
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted path string (`"fields.firstName.defaultValue"`).
    ///
    /// Empty segments from leading/trailing/doubled dots are skipped.
    pub fn parse_dotted(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(|s| Seg::Key(s.to_owned()))
                .collect(),
        )
    }

    /// Append a key segment (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Push a segment onto the path.
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The path without its last segment, or `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// True if `self` is a strict ancestor of `other` (a proper prefix).
    pub fn is_strict_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Seg::Key(k) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                Seg::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

/// Construct a [`Path`] from a sequence of segments.
///
/// String literals become key segments, integers become index segments.
#[macro_export]
macro_rules! fpath {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}

/// Collect every dotted path reachable by descending into object-valued
/// properties, depth-first. Arrays are not descended into.
pub fn enumerate_paths(value: &Value) -> Vec<Path> {
    let mut out = Vec::new();
    collect_paths(value, &Path::root(), &mut out);
    out
}

fn collect_paths(value: &Value, base: &Path, out: &mut Vec<Path>) {
    if let Value::Object(obj) = value {
        for (k, v) in obj {
            let path = base.clone().key(k);
            out.push(path.clone());
            collect_paths(v, &path, out);
        }
    }
}

/// Read the value at a path; `None` if any segment is missing.
pub fn read_at<'a>(value: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = value;
    for seg in path.segments() {
        current = match seg {
            Seg::Key(k) => current.get(k)?,
            Seg::Index(i) => current.get(i)?,
        };
    }
    Some(current)
}

/// Drop every path that has another selected path as a strict ancestor,
/// and deduplicate, preserving first-seen order.
pub fn normalize_paths(paths: &[Path]) -> Vec<Path> {
    let mut out: Vec<Path> = Vec::with_capacity(paths.len());
    for p in paths {
        let covered = paths.iter().any(|other| other.is_strict_ancestor_of(p));
        if !covered && !out.contains(p) {
            out.push(p.clone());
        }
    }
    out
}

/// Read the value(s) selected by a set of paths.
///
/// After ancestor normalization, a single remaining path yields the value
/// relative to that path. Multiple paths yield a root-shaped object
/// containing only those paths' values (the minimal nested shape).
///
/// Returns `None` if any normalized path is missing from `value`.
pub fn read_at_many(value: &Value, paths: &[Path]) -> Option<Value> {
    let normalized = normalize_paths(paths);
    match normalized.as_slice() {
        [] => None,
        [single] => read_at(value, single).cloned(),
        many => {
            let mut slice = Value::Object(Map::new());
            for path in many {
                let found = read_at(value, path)?.clone();
                insert_at(&mut slice, path, found);
            }
            Some(slice)
        }
    }
}

/// Insert a value at a key path, creating intermediate objects.
fn insert_at(dest: &mut Value, path: &Path, value: Value) {
    let mut current = dest;
    let segments = path.segments();
    for (i, seg) in segments.iter().enumerate() {
        let Seg::Key(key) = seg else {
            // Selections address object keys only; index segments never
            // reach reconstruction.
            return;
        };
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let obj = current.as_object_mut().expect("object ensured above");
        if i == segments.len() - 1 {
            obj.insert(key.clone(), value);
            return;
        }
        current = obj.entry(key.clone()).or_insert(Value::Null);
    }
}

/// Return a new root with the leaf at `path` replaced (pure function).
///
/// Every ancestor along the path must already exist with a compatible
/// container type; the update engine only writes paths it has already
/// validated, so a failure here indicates an internal inconsistency.
pub fn write_at(root: &Value, path: &Path, value: Value) -> FormResult<Value> {
    let mut out = root.clone();
    if path.is_empty() {
        return Ok(value);
    }

    let mut current = &mut out;
    let segments = path.segments();
    for (i, seg) in segments.iter().enumerate() {
        let last = i == segments.len() - 1;
        match seg {
            Seg::Key(key) => {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| FormError::path_not_found(path.clone()))?;
                if last {
                    obj.insert(key.clone(), value);
                    return Ok(out);
                }
                current = obj
                    .get_mut(key)
                    .ok_or_else(|| FormError::path_not_found(path.clone()))?;
            }
            Seg::Index(idx) => {
                let arr = current
                    .as_array_mut()
                    .ok_or_else(|| FormError::path_not_found(path.clone()))?;
                if *idx >= arr.len() {
                    return Err(FormError::path_not_found(path.clone()));
                }
                if last {
                    arr[*idx] = value;
                    return Ok(out);
                }
                current = &mut arr[*idx];
            }
        }
    }
    unreachable!("non-empty path always returns from the loop")
}
