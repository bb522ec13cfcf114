//! Route registration errors.

use http::Method;
use thiserror::Error;

/// Errors returned when a route or scope pattern cannot be registered.
///
/// Lookups never fail; a path that matches nothing is reported as
/// `None` by [`Router::find`](crate::Router::find).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern does not begin with `/`.
    #[error("route pattern must begin with '/': {pattern:?}")]
    MissingLeadingSlash {
        /// The offending pattern.
        pattern: String,
    },

    /// The pattern contains an empty segment such as `/a//b`.
    #[error("route pattern contains an empty segment: {pattern:?}")]
    EmptySegment {
        /// The offending pattern.
        pattern: String,
    },

    /// A `:` parameter marker without a name.
    #[error("route pattern has an unnamed parameter: {pattern:?}")]
    UnnamedParam {
        /// The offending pattern.
        pattern: String,
    },

    /// The same parameter name appears twice in one pattern.
    #[error("parameter {name:?} appears more than once in {pattern:?}")]
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated parameter name.
        name: String,
    },

    /// Wildcards are only accepted in middleware scope patterns.
    #[error("wildcard segments are not supported in route patterns: {pattern:?}")]
    WildcardInRoute {
        /// The offending pattern.
        pattern: String,
    },

    /// A middleware scope with `*` anywhere but its last character.
    #[error("wildcard may only end a scope pattern: {pattern:?}")]
    MisplacedWildcard {
        /// The offending pattern.
        pattern: String,
    },

    /// A pattern with the same segment shape is already registered for the method.
    #[error("{method} {pattern:?} conflicts with existing route {existing:?}")]
    Conflict {
        /// HTTP method of the rejected registration.
        method: Method,
        /// The rejected pattern.
        pattern: String,
        /// The previously registered pattern that shadows it.
        existing: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouteError::MissingLeadingSlash {
            pattern: "users".to_string(),
        };
        assert_eq!(err.to_string(), "route pattern must begin with '/': \"users\"");

        let err = RouteError::Conflict {
            method: Method::GET,
            pattern: "/users/:name".to_string(),
            existing: "/users/:id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GET \"/users/:name\" conflicts with existing route \"/users/:id\""
        );
    }
}
