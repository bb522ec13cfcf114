//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! Adds the `Access-Control-*` headers to every request it sees and answers
//! `OPTIONS` preflights itself with `204 No Content`, without running
//! anything further down the chain.
//!
//! Unmatched requests never reach middleware, so a path that should answer
//! preflights needs an `OPTIONS` route registered for it.
//!
//! ## Example
//!
//! ```
//! use merlin_middleware::stages::{cors_with_config, CorsConfig};
//!
//! let cors = cors_with_config(CorsConfig {
//!     allow_origins: vec!["https://app.example.com".into()],
//!     ..CorsConfig::default()
//! });
//! # let _ = cors;
//! ```

use http::{header, HeaderValue, Method};
use merlin_core::{ApiResponse, Context};

use crate::middleware::{Middleware, Next};

/// Origins used when a config lists none.
const FALLBACK_ORIGINS: &[&str] = &["*"];
/// Methods used when a config lists none.
const FALLBACK_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];
/// Headers used when a config lists none.
const FALLBACK_HEADERS: &[&str] = &["Content-Type", "Authorization"];

/// CORS settings.
///
/// Empty lists fall back to permissive values when the middleware is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins. `*` matches any origin; others compare case-insensitively.
    pub allow_origins: Vec<String>,
    /// Methods advertised in `Access-Control-Allow-Methods`.
    pub allow_methods: Vec<String>,
    /// Headers advertised in `Access-Control-Allow-Headers`.
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".into()],
            allow_methods: ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
                .map(String::from)
                .to_vec(),
            allow_headers: [
                "Content-Type",
                "Authorization",
                "Accept",
                "Origin",
                "X-Requested-With",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Middleware that applies a [`CorsConfig`].
///
/// Preflights are only answered on paths with a registered `OPTIONS` route.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    origins: Vec<String>,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
}

impl CorsMiddleware {
    /// Builds the middleware, filling empty lists with fallbacks.
    #[must_use]
    pub fn new(config: CorsConfig) -> Self {
        let origins = or_fallback(config.allow_origins, FALLBACK_ORIGINS);
        let methods = or_fallback(config.allow_methods, FALLBACK_METHODS);
        let headers = or_fallback(config.allow_headers, FALLBACK_HEADERS);

        Self {
            origins,
            allow_methods: joined_header(&methods),
            allow_headers: joined_header(&headers),
        }
    }

    /// Returns true if `origin` is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new(CorsConfig::default())
    }
}

fn or_fallback(values: Vec<String>, fallback: &[&str]) -> Vec<String> {
    if values.is_empty() {
        fallback.iter().map(|s| (*s).to_string()).collect()
    } else {
        values
    }
}

fn joined_header(values: &[String]) -> Option<HeaderValue> {
    let joined = values.join(", ");
    match HeaderValue::from_str(&joined) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(value = %joined, "CORS list is not a valid header value, skipping");
            None
        }
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        let echoed = ctx
            .header(header::ORIGIN)
            .filter(|origin| self.is_allowed(origin))
            .and_then(|origin| HeaderValue::from_str(origin).ok());
        if let Some(origin) = echoed {
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        if let Some(methods) = &self.allow_methods {
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(headers) = &self.allow_headers {
            ctx.set_header(header::ACCESS_CONTROL_ALLOW_HEADERS, headers.clone());
        }
        ctx.set_header(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );

        if *ctx.method() == Method::OPTIONS {
            ctx.no_content(204);
            return ApiResponse::new(true, "CORS preflight", 204);
        }

        next.run(ctx)
    }
}

/// CORS middleware with [`CorsConfig::default`].
#[must_use]
pub fn cors() -> CorsMiddleware {
    CorsMiddleware::default()
}

/// CORS middleware with a custom config.
#[must_use]
pub fn cors_with_config(config: CorsConfig) -> CorsMiddleware {
    CorsMiddleware::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use merlin_core::{Handler, Params};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn request(method: Method, origin: Option<&str>) -> Context {
        let mut builder = http::Request::builder().method(method).uri("/api");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        Context::new(builder.body(Bytes::new()).unwrap(), Params::new())
    }

    fn ok_handler() -> Handler {
        Handler::new(|ctx: &mut Context| ctx.string(200, "ok"))
    }

    #[test]
    fn test_default_config() {
        let config = CorsConfig::default();
        assert_eq!(config.allow_origins, vec!["*"]);
        assert_eq!(
            config.allow_methods,
            vec!["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
        );
        assert!(config.allow_headers.contains(&"X-Requested-With".to_string()));
    }

    #[test]
    fn test_empty_config_falls_back() {
        let mw = cors_with_config(CorsConfig {
            allow_origins: vec![],
            allow_methods: vec![],
            allow_headers: vec![],
        });
        let mut ctx = request(Method::GET, Some("https://any.example"));
        let handler = ok_handler();
        mw.process(&mut ctx, Next::new(&[], &handler));

        let headers = ctx.response_headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://any.example");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, PATCH, DELETE, OPTIONS"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
    }

    #[test]
    fn test_allowed_origin_is_echoed() {
        let mw = cors_with_config(CorsConfig {
            allow_origins: vec!["https://App.Example.com".into()],
            ..CorsConfig::default()
        });
        let mut ctx = request(Method::GET, Some("https://app.example.com"));
        let handler = ok_handler();
        let resp = mw.process(&mut ctx, Next::new(&[], &handler));

        assert_eq!(resp.code, 200);
        assert_eq!(
            ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(
            ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[test]
    fn test_disallowed_origin_not_echoed() {
        let mw = cors_with_config(CorsConfig {
            allow_origins: vec!["https://app.example.com".into()],
            ..CorsConfig::default()
        });
        let mut ctx = request(Method::GET, Some("https://evil.example"));
        let handler = ok_handler();
        let resp = mw.process(&mut ctx, Next::new(&[], &handler));

        assert_eq!(resp.code, 200);
        assert!(ctx
            .response_headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
        assert!(ctx
            .response_headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .is_some());
    }

    #[test]
    fn test_preflight_short_circuits() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        let handler = Handler::new(move |ctx: &mut Context| {
            flag.store(true, Ordering::SeqCst);
            ctx.string(200, "handler")
        });

        let mut ctx = request(Method::OPTIONS, Some("https://app.example.com"));
        let resp = cors().process(&mut ctx, Next::new(&[], &handler));

        assert!(!reached.load(Ordering::SeqCst));
        assert_eq!(resp, ApiResponse::new(true, "CORS preflight", 204));
        assert!(ctx.is_handled());
        assert_eq!(ctx.status(), http::StatusCode::NO_CONTENT);
        assert!(ctx.response_body().is_empty());
        assert_eq!(
            ctx.response_headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
    }

    #[test]
    fn test_middleware_name() {
        assert_eq!(cors().name(), "cors");
    }
}
