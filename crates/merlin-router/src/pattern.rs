//! Route pattern parsing.
//!
//! A pattern is split on `/` into segments. A segment starting with `:` is a
//! named parameter that binds exactly one non-empty path segment; every other
//! segment is a literal compared byte for byte.
//!
//! Leading and trailing slashes are not significant, so `/users` and
//! `/users/` have the same segments and `/` has none.

use crate::error::RouteError;
use crate::params::Params;

/// One `/`-delimited component of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal segment (e.g. `users`).
    Static(String),
    /// Named parameter (e.g. `:id`), stored without the colon.
    Param(String),
}

impl Segment {
    /// Returns true if both segments accept exactly the same path segments.
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Static(a), Segment::Static(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses and validates a route pattern.
    ///
    /// # Example
    ///
    /// ```rust
    /// use merlin_router::{Pattern, Segment};
    ///
    /// let pattern = Pattern::parse("/users/:id").unwrap();
    /// assert_eq!(pattern.segments()[1], Segment::Param("id".to_string()));
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash {
                pattern: raw.to_string(),
            });
        }

        let mut segments = Vec::new();
        for part in split_path(raw) {
            if part.is_empty() {
                return Err(RouteError::EmptySegment {
                    pattern: raw.to_string(),
                });
            }
            if part.starts_with('*') {
                return Err(RouteError::WildcardInRoute {
                    pattern: raw.to_string(),
                });
            }

            let segment = match part.strip_prefix(':') {
                Some("") => {
                    return Err(RouteError::UnnamedParam {
                        pattern: raw.to_string(),
                    })
                }
                Some(name) => {
                    let taken = segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name));
                    if taken {
                        return Err(RouteError::DuplicateParam {
                            pattern: raw.to_string(),
                            name: name.to_string(),
                        });
                    }
                    Segment::Param(name.to_string())
                }
                None => Segment::Static(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the pattern as it was registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the pattern has no parameter segments.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Static(_)))
    }

    /// Returns true if both patterns accept exactly the same paths.
    ///
    /// Parameter names are ignored: `/users/:id` and `/users/:name` have the
    /// same shape.
    #[must_use]
    pub fn same_shape(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    /// Matches already-split path segments, binding parameters on success.
    ///
    /// Segment counts must be identical; there is no prefix matching.
    #[must_use]
    pub fn match_segments(&self, path: &[&str]) -> Option<Params> {
        if path.len() != self.segments.len() {
            return None;
        }

        for (segment, part) in self.segments.iter().zip(path) {
            match segment {
                Segment::Static(literal) if literal.as_str() != *part => return None,
                Segment::Param(_) if part.is_empty() => return None,
                _ => {}
            }
        }

        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(path) {
            if let Segment::Param(name) = segment {
                params.push(name.as_str(), *part);
            }
        }
        Some(params)
    }

    /// Matches a raw request path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_path(path).collect();
        self.match_segments(&parts)
    }
}

/// Splits a path into segments, ignoring one leading and trailing slash run.
///
/// Interior empty segments are preserved so that `/a//b` never matches a
/// parameter in the empty position.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}
