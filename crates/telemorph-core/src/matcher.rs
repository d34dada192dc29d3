//! # Pattern Matcher
//!
//! Recognizes concrete paths against declared template paths.
//!
//! Two paths match iff:
//! - the pattern origin is empty or equal to the concrete origin
//! - they have the same number of elements
//! - element names are equal position by position
//! - every element has the same number of keys, and each pattern key value is
//!   either the wildcard or equal to the concrete value
//!
//! No partial-length matches, no reordering. Matching is a pure predicate.

use crate::path::{Path, PathElem};
use crate::primitives::is_wildcard;

/// True if `concrete` matches `pattern`.
#[must_use]
pub fn path_matches(concrete: &Path, pattern: &Path) -> bool {
    if !pattern.origin.is_empty() && pattern.origin != concrete.origin {
        return false;
    }
    if concrete.elems.len() != pattern.elems.len() {
        return false;
    }
    concrete
        .elems
        .iter()
        .zip(&pattern.elems)
        .all(|(c, p)| elem_matches(c, p))
}

fn elem_matches(concrete: &PathElem, pattern: &PathElem) -> bool {
    if concrete.name != pattern.name || concrete.keys.len() != pattern.keys.len() {
        return false;
    }
    pattern.keys.iter().all(|(k, pv)| match concrete.keys.get(k) {
        Some(cv) => is_wildcard(pv) || cv == pv,
        None => false,
    })
}

/// An ordered set of patterns, each carrying a classification tag.
///
/// The first pattern that matches wins, so more specific patterns should be
/// inserted first when they overlap.
#[derive(Debug, Clone)]
pub struct PatternSet<T> {
    patterns: Vec<(Path, T)>,
}

impl<T> Default for PatternSet<T> {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }
}

impl<T> PatternSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern with its tag.
    pub fn insert(&mut self, pattern: Path, tag: T) {
        self.patterns.push((pattern, tag));
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, pattern: Path, tag: T) -> Self {
        self.insert(pattern, tag);
        self
    }

    /// Tag of the first pattern matching `path`.
    #[must_use]
    pub fn classify(&self, path: &Path) -> Option<&T> {
        self.patterns
            .iter()
            .find(|(pattern, _)| path_matches(path, pattern))
            .map(|(_, tag)| tag)
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if the set holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
