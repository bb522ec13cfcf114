//! Path scopes for conditional middleware.
//!
//! A scope is either an exact path (`/health`) or a prefix ending in `*`
//! (`/api/*`). A prefix scope covers the prefix itself and everything
//! beneath it, on segment boundaries: `/api/*` covers `/api`, `/api/` and
//! `/api/v1/users` but not `/apiary`. A bare `*` covers every path.
//!
//! Scopes are checked when they are compiled: a pattern must begin with `/`
//! and may only carry `*` as its last character.

use crate::error::RouteError;

/// A compiled conditional-middleware path scope.
///
/// # Example
///
/// ```rust
/// use merlin_router::Scope;
///
/// let scope = Scope::parse("/api/*").unwrap();
/// assert!(scope.matches("/api/v1/users"));
/// assert!(!scope.matches("/public/data"));
///
/// assert!(Scope::parse("api/*").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    raw: String,
    kind: ScopeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScopeKind {
    Exact(String),
    Prefix(String),
}

impl Scope {
    /// Compiles a scope pattern.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        if pattern != "*" && !pattern.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash {
                pattern: pattern.to_string(),
            });
        }
        let (body, wildcard) = match pattern.strip_suffix('*') {
            Some(prefix) => (prefix, true),
            None => (pattern, false),
        };
        if body.contains('*') {
            return Err(RouteError::MisplacedWildcard {
                pattern: pattern.to_string(),
            });
        }
        let kind = if wildcard {
            ScopeKind::Prefix(body.trim_end_matches('/').to_string())
        } else {
            ScopeKind::Exact(normalize(body).to_string())
        };
        Ok(Self {
            raw: pattern.to_string(),
            kind,
        })
    }

    /// Returns the pattern as it was given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if the scope ends in a wildcard.
    #[must_use]
    pub fn is_prefix(&self) -> bool {
        matches!(self.kind, ScopeKind::Prefix(_))
    }

    /// Tests a request path against the scope.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.kind {
            ScopeKind::Exact(exact) => normalize(path) == exact,
            ScopeKind::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Drops a trailing slash everywhere except the root path.
fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
