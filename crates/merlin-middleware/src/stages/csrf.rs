//! CSRF protection using the double-submit cookie pattern.
//!
//! The server token lives in a cookie. State-changing requests that carry a
//! client token (header first, cookie second) must present one matching the
//! server token. The cookie is refreshed on every checked request and the
//! token is exposed to handlers under a context key so templates can embed it.
//!
//! Token generation and comparison sit behind [`CsrfTokens`], so tests and
//! deployments can swap the scheme without touching the middleware.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use http::Method;
use merlin_core::{ApiResponse, Context, SetCookie};
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::{Middleware, Next};

/// Message written when a token does not match.
pub const INVALID_TOKEN_MESSAGE: &str = "invalid CSRF token";

/// CSRF settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfConfig {
    /// Request header carrying the client token.
    pub token_header: String,
    /// Cookie holding the server token.
    pub cookie_name: String,
    /// Context value key the token is stored under.
    pub context_key: String,
    /// Cookie lifetime.
    pub expiry: Duration,
    /// Methods that bypass the check entirely.
    pub skip_methods: Vec<Method>,
    /// Sets the `Secure` cookie attribute.
    pub cookie_secure: bool,
    /// Sets the `HttpOnly` cookie attribute.
    pub cookie_http_only: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_header: "X-CSRF-Token".into(),
            cookie_name: "csrf_token".into(),
            context_key: "csrf_token".into(),
            expiry: Duration::from_secs(24 * 60 * 60),
            skip_methods: vec![Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE],
            cookie_secure: true,
            cookie_http_only: true,
        }
    }
}

/// Token scheme used by [`CsrfMiddleware`].
pub trait CsrfTokens: Send + Sync + 'static {
    /// Creates a fresh server token.
    fn generate(&self) -> String;

    /// Returns true if `client` proves possession of `server`.
    fn verify(&self, server: &str, client: &str) -> bool;
}

/// Random UUID tokens compared in constant time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokens;

impl CsrfTokens for RandomTokens {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn verify(&self, server: &str, client: &str) -> bool {
        constant_time_eq(server.as_bytes(), client.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// A rejected CSRF check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsrfError {
    /// The client token does not match the server token.
    #[error("invalid CSRF token")]
    InvalidToken,
}

/// Custom rejection hook.
pub type CsrfErrorHandler = Arc<dyn Fn(&mut Context, &CsrfError) -> ApiResponse + Send + Sync>;

/// Middleware enforcing [`CsrfConfig`].
pub struct CsrfMiddleware {
    config: CsrfConfig,
    tokens: Arc<dyn CsrfTokens>,
    on_error: Option<CsrfErrorHandler>,
}

impl CsrfMiddleware {
    /// Creates the middleware with [`RandomTokens`].
    #[must_use]
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config,
            tokens: Arc::new(RandomTokens),
            on_error: None,
        }
    }

    /// Replaces the token scheme.
    #[must_use]
    pub fn with_tokens(mut self, tokens: impl CsrfTokens) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Installs a custom rejection handler.
    ///
    /// Without one, rejections write `403` with a plain-text body.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Context, &CsrfError) -> ApiResponse + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Returns the active config.
    #[must_use]
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    fn client_token(&self, ctx: &Context) -> Option<String> {
        ctx.header(self.config.token_header.as_str())
            .filter(|t| !t.is_empty())
            .or_else(|| ctx.cookie(&self.config.cookie_name).filter(|t| !t.is_empty()))
            .map(str::to_string)
    }

    fn server_token(&self, ctx: &Context) -> String {
        ctx.cookie(&self.config.cookie_name)
            .filter(|t| !t.is_empty())
            .map_or_else(|| self.tokens.generate(), str::to_string)
    }

    fn reject(&self, ctx: &mut Context) -> ApiResponse {
        let err = CsrfError::InvalidToken;
        tracing::debug!(http.path = %ctx.path(), error = %err, "CSRF check failed");
        if let Some(handler) = &self.on_error {
            return handler(ctx, &err);
        }
        ctx.string(403, INVALID_TOKEN_MESSAGE);
        ApiResponse::error(INVALID_TOKEN_MESSAGE, 403)
    }
}

impl Default for CsrfMiddleware {
    fn default() -> Self {
        Self::new(CsrfConfig::default())
    }
}

impl fmt::Debug for CsrfMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfMiddleware")
            .field("config", &self.config)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl Middleware for CsrfMiddleware {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        if self.config.skip_methods.contains(ctx.method()) {
            return next.run(ctx);
        }

        let server = self.server_token(ctx);
        if let Some(client) = self.client_token(ctx) {
            if !self.tokens.verify(&server, &client) {
                return self.reject(ctx);
            }
        }

        let cookie = SetCookie::new(self.config.cookie_name.as_str(), server.as_str())
            .path("/")
            .expires(SystemTime::now() + self.config.expiry)
            .secure(self.config.cookie_secure)
            .http_only(self.config.cookie_http_only);
        ctx.set_cookie(&cookie);
        ctx.set(self.config.context_key.as_str(), server);

        next.run(ctx)
    }
}

/// CSRF middleware with [`CsrfConfig::default`].
#[must_use]
pub fn csrf() -> CsrfMiddleware {
    CsrfMiddleware::default()
}

/// CSRF middleware with a custom config.
#[must_use]
pub fn csrf_with_config(config: CsrfConfig) -> CsrfMiddleware {
    CsrfMiddleware::new(config)
}
