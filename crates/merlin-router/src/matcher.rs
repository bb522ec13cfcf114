//! Method-keyed path matcher.
//!
//! Patterns are kept per HTTP method in registration order and a lookup
//! scans them linearly. The first structurally matching pattern wins, so
//! `/users/new` registered before `/users/:id` takes `/users/new`, and the
//! reverse registration order hands it to the parameter route.

use std::collections::HashMap;

use http::Method;
use smallvec::SmallVec;

use crate::error::RouteError;
use crate::params::Params;
use crate::pattern::{split_path, Pattern};

/// Segments held inline while matching a path.
const INLINE_SEGMENTS: usize = 8;

#[derive(Debug, Clone)]
struct Entry<T> {
    pattern: Pattern,
    value: T,
}

/// A compiled structure over registered `(method, pattern)` pairs.
///
/// Registration happens during setup; afterwards the matcher is only read,
/// which lets a frozen matcher be shared across threads without locking.
#[derive(Debug, Clone)]
pub struct PathMatcher<T> {
    methods: HashMap<Method, Vec<Entry<T>>>,
    len: usize,
}

impl<T> Default for PathMatcher<T> {
    fn default() -> Self {
        Self {
            methods: HashMap::new(),
            len: 0,
        }
    }
}

impl<T> PathMatcher<T> {
    /// Creates an empty matcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `method` and `pattern`.
    ///
    /// Fails on a structurally invalid pattern, or when a pattern of the
    /// same segment shape is already registered for `method` (it would
    /// shadow this one forever).
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;
        let entries = self.methods.entry(method.clone()).or_default();

        if let Some(existing) = entries.iter().find(|e| e.pattern.same_shape(&pattern)) {
            return Err(RouteError::Conflict {
                method,
                pattern: pattern.as_str().to_string(),
                existing: existing.pattern.as_str().to_string(),
            });
        }

        entries.push(Entry { pattern, value });
        self.len += 1;
        Ok(())
    }

    /// Resolves `method` and `path` to the first matching value.
    ///
    /// A path registered only under a different method is not found.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&T, &Pattern, Params)> {
        let entries = self.methods.get(method)?;
        let segments: SmallVec<[&str; INLINE_SEGMENTS]> = split_path(path).collect();

        entries.iter().find_map(|entry| {
            entry
                .pattern
                .match_segments(&segments)
                .map(|params| (&entry.value, &entry.pattern, params))
        })
    }

    /// Returns the methods under which `path` resolves, sorted by name.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let segments: SmallVec<[&str; INLINE_SEGMENTS]> = split_path(path).collect();
        let mut allowed: Vec<Method> = self
            .methods
            .iter()
            .filter(|(_, entries)| {
                entries
                    .iter()
                    .any(|e| e.pattern.match_segments(&segments).is_some())
            })
            .map(|(method, _)| method.clone())
            .collect();
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }

    /// Iterates over every registration as `(method, pattern, value)`.
    ///
    /// Order within one method is registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &Pattern, &T)> {
        self.methods.iter().flat_map(|(method, entries)| {
            entries.iter().map(move |e| (method, &e.pattern, &e.value))
        })
    }

    /// Returns the number of registered patterns across all methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
