//! Bearer token authentication.
//!
//! Reads `Authorization: Bearer <token>`, hands the token to a
//! [`TokenVerifier`] and stores the verified claims under the `user`
//! context value. Signature schemes and key management belong to the
//! verifier; this middleware only enforces the header contract.
//!
//! ```
//! use merlin_middleware::stages::{jwt, TokenError};
//! use serde_json::json;
//!
//! let auth = jwt(|token: &str| {
//!     if token == "letmein" {
//!         Ok(json!({"sub": "alice"}))
//!     } else {
//!         Err(TokenError::Invalid("unknown token".into()))
//!     }
//! });
//! # let _ = auth;
//! ```

use std::fmt;
use std::sync::Arc;

use http::header;
use merlin_core::{ApiResponse, Context};
use serde_json::Value;
use thiserror::Error;

use crate::middleware::{Middleware, Next};

/// Context value key holding verified claims.
pub const CLAIMS_KEY: &str = "user";

const BEARER_PREFIX: &str = "Bearer ";

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token is past its expiry.
    #[error("token expired")]
    Expired,
    /// The token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Verifies a bearer token and returns its claims.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Verifies `token`.
    fn verify(&self, token: &str) -> Result<Value, TokenError>;
}

impl<F> TokenVerifier for F
where
    F: Fn(&str) -> Result<Value, TokenError> + Send + Sync + 'static,
{
    fn verify(&self, token: &str) -> Result<Value, TokenError> {
        self(token)
    }
}

/// Middleware requiring a verified bearer token.
#[derive(Clone)]
pub struct JwtMiddleware {
    verifier: Arc<dyn TokenVerifier>,
}

impl JwtMiddleware {
    /// Creates the middleware around `verifier`.
    pub fn new(verifier: impl TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }
}

impl fmt::Debug for JwtMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for JwtMiddleware {
    fn name(&self) -> &'static str {
        "jwt"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        let Some(token) = ctx
            .header(header::AUTHORIZATION)
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::to_string)
        else {
            return ctx.error_json("Missing token", None, 401);
        };

        match self.verifier.verify(&token) {
            Ok(claims) => {
                ctx.set(CLAIMS_KEY, claims);
                next.run(ctx)
            }
            Err(err) => {
                tracing::debug!(http.path = %ctx.path(), error = %err, "bearer token rejected");
                ctx.error_json("Invalid token", None, 401)
            }
        }
    }
}

/// Bearer token middleware around `verifier`.
pub fn jwt(verifier: impl TokenVerifier) -> JwtMiddleware {
    JwtMiddleware::new(verifier)
}
