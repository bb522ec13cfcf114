//! Path router for Merlin.
//!
//! This crate resolves an HTTP method and path to a registered value and the
//! path parameters bound along the way.
//!
//! # Pattern Syntax
//!
//! ```text
//!  Syntax    Type
//!  users     literal segment, matched verbatim
//!  :name     named parameter, matches exactly one non-empty segment
//! ```
//!
//! ```text
//!  Pattern: /users/:id
//!
//!   /users/123            match: id="123"
//!   /users/123/           match: id="123"
//!   /users                no match
//!   /users/123/extra      no match
//! ```
//!
//! Lookups walk the patterns registered for the request method in
//! registration order. The first pattern with the same segment count whose
//! literals all agree wins. A path registered only under another method is
//! reported as not found.
//!
//! Conditional middleware uses the separate [`Scope`] syntax, where a
//! trailing `*` means "this prefix and everything under it".
//!
//! # Example
//!
//! ```rust
//! use merlin_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.get("/users", "listUsers").unwrap();
//! router.get("/users/:id", "getUser").unwrap();
//! router.post("/users/:id/update", "updateUser").unwrap();
//!
//! let found = router.find(&Method::GET, "/users/123").unwrap();
//! assert_eq!(*found.value, "getUser");
//! assert_eq!(found.params.get("id"), Some("123"));
//!
//! assert!(router.find(&Method::POST, "/users").is_none());
//! assert!(router.find(&Method::GET, "/users/123/extra").is_none());
//! ```

mod error;
mod matcher;
mod params;
mod pattern;
mod router;
mod scope;

pub use error::RouteError;
pub use matcher::PathMatcher;
pub use params::Params;
pub use pattern::{split_path, Pattern, Segment};
pub use router::Router;
pub use scope::Scope;

/// A matched route with its registered value and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the route
    pub value: &'a T,
    /// The pattern that matched, as registered
    pub pattern: &'a str,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, pattern: &'a str, params: Params) -> Self {
        Self {
            value,
            pattern,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn scenario_router() -> Router<&'static str> {
        let mut router = Router::new();
        router.handle(Method::GET, "/users", "list").unwrap();
        router.handle(Method::GET, "/users/:id", "show").unwrap();
        router.handle(Method::POST, "/users/:id/update", "update").unwrap();
        router
    }

    #[test]
    fn test_static_route_has_empty_params() {
        let router = scenario_router();
        let found = router.find(&Method::GET, "/users").unwrap();
        assert_eq!(*found.value, "list");
        assert!(found.params.is_empty());
    }

    #[test]
    fn test_param_route() {
        let router = scenario_router();
        let found = router.find(&Method::GET, "/users/123").unwrap();
        assert_eq!(*found.value, "show");
        assert_eq!(found.params.get("id"), Some("123"));
        assert_eq!(found.params.len(), 1);
    }

    #[test]
    fn test_param_route_with_post() {
        let router = scenario_router();
        let found = router.find(&Method::POST, "/users/456/update").unwrap();
        assert_eq!(*found.value, "update");
        assert_eq!(found.params.get("id"), Some("456"));
    }

    #[test]
    fn test_wrong_method() {
        // Reported as not found rather than 405; see allowed_methods for the latter
        let router = scenario_router();
        assert!(router.find(&Method::POST, "/users").is_none());
    }

    #[test]
    fn test_no_route_found() {
        let router = scenario_router();
        assert!(router.find(&Method::GET, "/unknown").is_none());
    }

    #[test]
    fn test_path_length_mismatch() {
        let router = scenario_router();
        assert!(router.find(&Method::GET, "/users/123/extra").is_none());
    }

    #[test]
    fn test_multiple_params() {
        let mut router = Router::new();
        router.get("/orgs/:orgId/users/:userId", "getOrgUser").unwrap();

        let found = router.find(&Method::GET, "/orgs/acme/users/123").unwrap();
        assert_eq!(found.params.get("orgId"), Some("acme"));
        assert_eq!(found.params.get("userId"), Some("123"));
    }
}
