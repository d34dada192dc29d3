//! # Path Model
//!
//! Immutable hierarchical locations addressed by telemetry updates.
//!
//! A [`Path`] is an ordered list of [`PathElem`]s, each with a name and an
//! optional set of keys, plus an origin (schema namespace) and a target
//! (device identity). Element order is significant and never reordered.
//! Keys are held in a `BTreeMap` so the canonical rendering is stable.
//!
//! ## String form
//!
//! ```text
//! origin:/elem/elem[key=value][other=value]
//! ```
//!
//! Inside a key value, `]` and `\` are escaped with a backslash when
//! rendering. `/` needs no escape within brackets. When parsing, any
//! backslash-escaped character is taken literally, so `\/` reads as `/`.

use crate::TelemorphError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// PATH ELEMENT
// =============================================================================

/// One element of a path: a name and its key-name → key-value map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PathElem {
    /// Element name.
    pub name: String,
    /// Keys of this element. Key names are unique.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, String>,
}

impl PathElem {
    /// Create an unkeyed element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: BTreeMap::new(),
        }
    }

    /// Builder-style key insertion.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(key.into(), value.into());
        self
    }

    /// Value of `key`, if present.
    #[must_use]
    pub fn key(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.keys {
            write!(f, "[{}={}]", k, escape_key_value(v))?;
        }
        Ok(())
    }
}

// =============================================================================
// PATH
// =============================================================================

/// A hierarchical, optionally keyed location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Path {
    /// Schema namespace. Empty means "unspecified".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    /// Device identity. Only meaningful on a notification prefix.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    /// Ordered elements.
    #[serde(default, rename = "elem")]
    pub elems: Vec<PathElem>,
}

impl Path {
    /// Create a path from elements with no origin or target.
    #[must_use]
    pub fn new(elems: Vec<PathElem>) -> Self {
        Self {
            origin: String::new(),
            target: String::new(),
            elems,
        }
    }

    /// Set the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Append an element.
    #[must_use]
    pub fn child(mut self, elem: PathElem) -> Self {
        self.elems.push(elem);
        self
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// True if the path has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Name of the last element, if any.
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.elems.last().map(|e| e.name.as_str())
    }

    /// Join a prefix with a suffix.
    ///
    /// The prefix's origin and target are kept; the suffix supplies them only
    /// where the prefix leaves them empty. Elements are concatenated in order.
    #[must_use]
    pub fn join(&self, suffix: &Path) -> Path {
        let origin = if self.origin.is_empty() {
            suffix.origin.clone()
        } else {
            self.origin.clone()
        };
        let target = if self.target.is_empty() {
            suffix.target.clone()
        } else {
            self.target.clone()
        };
        let mut elems = Vec::with_capacity(self.elems.len() + suffix.elems.len());
        elems.extend(self.elems.iter().cloned());
        elems.extend(suffix.elems.iter().cloned());
        Path {
            origin,
            target,
            elems,
        }
    }

    /// Key `key` of the element `offset` positions from the end
    /// (`offset == 1` is the last element).
    ///
    /// Fails loudly when the path is too short or the key is missing, since
    /// callers only use this on paths that already matched a known shape.
    pub fn key_from_end(&self, offset: usize, key: &str) -> Result<&str, TelemorphError> {
        if offset == 0 || self.elems.len() < offset {
            return Err(TelemorphError::PathTooShort {
                path: self.to_string(),
                min: offset,
            });
        }
        let elem = &self.elems[self.elems.len() - offset];
        elem.key(key).ok_or_else(|| TelemorphError::InvalidPath {
            path: self.to_string(),
            reason: format!("element '{}' has no key '{}'", elem.name, key),
        })
    }

    /// Canonical string without the target, used as a mapping key.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Parse a path from its string form.
    ///
    /// ```
    /// use telemorph_core::Path;
    ///
    /// let p = Path::parse("openconfig:/interfaces/interface[name=Eth1]/state").unwrap();
    /// assert_eq!(p.origin, "openconfig");
    /// assert_eq!(p.len(), 3);
    /// assert_eq!(p.elems[1].key("name"), Some("Eth1"));
    /// ```
    pub fn parse(input: &str) -> Result<Self, TelemorphError> {
        let invalid = |reason: &str| TelemorphError::InvalidPath {
            path: input.to_string(),
            reason: reason.to_string(),
        };

        let (origin, rest) = split_origin(input);
        if !rest.is_empty() && !rest.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }

        let mut elems = Vec::new();
        let mut chars = rest.chars().peekable();
        // Skip the leading slash.
        chars.next();

        while chars.peek().is_some() {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '/' || c == '[' {
                    break;
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                if chars.peek().is_none() {
                    // Trailing slash.
                    break;
                }
                return Err(invalid("empty element name"));
            }

            let mut elem = PathElem::new(name);
            while chars.peek() == Some(&'[') {
                chars.next();
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('=') => break,
                        Some(']') | None => return Err(invalid("key without '='")),
                        Some(c) => key.push(c),
                    }
                }
                if key.is_empty() {
                    return Err(invalid("empty key name"));
                }
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(c) => value.push(c),
                            None => return Err(invalid("dangling escape")),
                        },
                        Some(']') => break,
                        Some(c) => value.push(c),
                        None => return Err(invalid("unterminated key")),
                    }
                }
                if elem.keys.insert(key, value).is_some() {
                    return Err(invalid("duplicate key name"));
                }
            }

            match chars.next() {
                None | Some('/') => {}
                Some(_) => return Err(invalid("unexpected character after key")),
            }
            elems.push(elem);
        }

        Ok(Path::new(elems).with_origin(origin))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.origin.is_empty() {
            write!(f, "{}:", self.origin)?;
        }
        if self.elems.is_empty() {
            return f.write_str("/");
        }
        for elem in &self.elems {
            write!(f, "/{}", elem)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = TelemorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `origin:/rest` into its parts. A colon after the first `/` belongs
/// to the path, not the origin.
fn split_origin(input: &str) -> (&str, &str) {
    match (input.find(':'), input.find('/')) {
        (Some(colon), Some(slash)) if colon < slash => (&input[..colon], &input[colon + 1..]),
        (Some(colon), None) => (&input[..colon], &input[colon + 1..]),
        _ => ("", input),
    }
}

fn escape_key_value(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
