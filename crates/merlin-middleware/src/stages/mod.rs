//! Stock middleware.
//!
//! Each stage is an ordinary [`Middleware`](crate::Middleware) and can be
//! used globally, conditionally, or on a group.
//!
//! - [`request_id`] - generate or propagate `X-Request-ID`
//! - [`logger`] - one structured log event per request
//! - [`recovery`] - turn panics into `500` responses
//! - [`cors`] - cross-origin headers and preflight answers
//! - [`csrf`] - double-submit cookie CSRF protection
//! - [`jwt`] - bearer token authentication
//! - [`validation`] - decode and validate JSON bodies
//!
//! A typical global order is recovery, request ID, logger, then the rest.

pub mod cors;
pub mod csrf;
pub mod jwt;
pub mod logger;
pub mod recovery;
pub mod request_id;
pub mod validation;

pub use cors::{cors, cors_with_config, CorsConfig, CorsMiddleware};
pub use csrf::{
    csrf, csrf_with_config, CsrfConfig, CsrfError, CsrfErrorHandler, CsrfMiddleware, CsrfTokens,
    RandomTokens,
};
pub use jwt::{jwt, JwtMiddleware, TokenError, TokenVerifier, CLAIMS_KEY};
pub use logger::{logger, Logger};
pub use recovery::{recovery, Recovery};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER, REQUEST_ID_KEY};
pub use validation::{validate_json, ValidateJson};
