//! High-level route registry.
//!
//! This module provides the [`Router`] struct, the attachment point used by
//! the server and by route groups for registering and resolving routes.

use http::Method;

use crate::error::RouteError;
use crate::matcher::PathMatcher;
use crate::RouteMatch;

/// Route registry over a [`PathMatcher`].
///
/// `T` is whatever the caller wants to resolve to: a handler, an
/// operation name, or a richer route record.
///
/// # Example
///
/// ```rust
/// use merlin_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.get("/users", "listUsers").unwrap();
/// router.get("/users/:id", "getUser").unwrap();
///
/// let found = router.find(&Method::GET, "/users/123").unwrap();
/// assert_eq!(*found.value, "getUser");
/// assert_eq!(found.params.get("id"), Some("123"));
/// ```
///
/// # Route Priority
///
/// There is no priority scoring. Patterns are tried in registration order
/// and the first one whose shape fits the path wins.
#[derive(Debug, Clone)]
pub struct Router<T> {
    matcher: PathMatcher<T>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: PathMatcher::new(),
        }
    }

    /// Registers `value` for `method` and `path`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use merlin_router::Router;
    /// use http::Method;
    ///
    /// let mut router = Router::new();
    /// router.handle(Method::OPTIONS, "/users", "usersPreflight").unwrap();
    /// assert!(router.handle(Method::OPTIONS, "users", "bad").is_err());
    /// ```
    pub fn handle(&mut self, method: Method, path: &str, value: T) -> Result<(), RouteError> {
        self.matcher.insert(method, path, value)
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, path: &str, value: T) -> Result<(), RouteError> {
        self.handle(Method::GET, path, value)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, path: &str, value: T) -> Result<(), RouteError> {
        self.handle(Method::POST, path, value)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, path: &str, value: T) -> Result<(), RouteError> {
        self.handle(Method::PUT, path, value)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, path: &str, value: T) -> Result<(), RouteError> {
        self.handle(Method::PATCH, path, value)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, path: &str, value: T) -> Result<(), RouteError> {
        self.handle(Method::DELETE, path, value)
    }

    /// Resolves a method and path.
    ///
    /// Returns `None` when nothing matches, including when the path is only
    /// registered under a different method.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.matcher
            .lookup(method, path)
            .map(|(value, pattern, params)| RouteMatch::new(value, pattern.as_str(), params))
    }

    /// Returns the methods registered for a path, for `Allow` headers.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.matcher.allowed_methods(path)
    }

    /// Returns the underlying matcher.
    #[must_use]
    pub fn matcher(&self) -> &PathMatcher<T> {
        &self.matcher
    }

    /// Returns the number of routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }
}
