//! Core middleware trait and types.
//!
//! A middleware receives the request [`Context`] and a [`Next`] continuation.
//! Calling [`Next::run`] hands control to the rest of the chain and returns
//! its envelope; returning without calling it short-circuits everything
//! inside, including the route handler.
//!
//! # Example
//!
//! ```
//! use merlin_core::{ApiResponse, Context};
//! use merlin_middleware::{Middleware, Next};
//!
//! struct RequireJson;
//!
//! impl Middleware for RequireJson {
//!     fn name(&self) -> &'static str {
//!         "require_json"
//!     }
//!
//!     fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
//!         if ctx.header("content-type") != Some("application/json") {
//!             return ctx.error_json("expected JSON", None, 415);
//!         }
//!         next.run(ctx)
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use merlin_core::{ApiResponse, Context, Handler};

/// A type-erased middleware that can be stored in a list.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The core middleware trait.
///
/// # Invariants
///
/// - `next.run()` is called at most once; `Next` is consumed by it
/// - A middleware that does not call `next.run()` must return an envelope
///   describing its own response
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, optionally delegating to the rest of the chain.
    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse;
}

/// Continuation for the remainder of a middleware chain.
///
/// Holds the middleware still to run, outermost first, and the route
/// handler at the centre.
pub struct Next<'a> {
    middleware: &'a [BoxedMiddleware],
    handler: &'a Handler,
}

impl<'a> Next<'a> {
    /// Creates a continuation over `middleware` that ends in `handler`.
    #[must_use]
    pub fn new(middleware: &'a [BoxedMiddleware], handler: &'a Handler) -> Self {
        Self {
            middleware,
            handler,
        }
    }

    /// Invokes the next middleware, or the handler when none remain.
    ///
    /// Consumes `self` so the rest of the chain runs at most once.
    pub fn run(self, ctx: &mut Context) -> ApiResponse {
        match self.middleware.split_first() {
            Some((current, rest)) => current.process(ctx, Next::new(rest, self.handler)),
            None => self.handler.call(ctx),
        }
    }

    /// Returns how many middleware remain before the handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.middleware.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```
/// use merlin_middleware::from_fn;
///
/// let tag = from_fn("tag", |ctx, next| {
///     ctx.set("tagged", true);
///     next.run(ctx)
/// });
/// # let _ = tag;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Context, Next<'_>) -> ApiResponse + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        (self.func)(ctx, next)
    }
}

/// Builds a [`FnMiddleware`] from a closure.
pub fn from_fn<F>(name: &'static str, func: F) -> FnMiddleware<F>
where
    F: Fn(&mut Context, Next<'_>) -> ApiResponse + Send + Sync + 'static,
{
    FnMiddleware::new(name, func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use merlin_router::Params;

    struct Recording {
        name: &'static str,
    }

    impl Middleware for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
            let mut seen = ctx
                .get("seen")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            seen.push_str(self.name);
            ctx.set("seen", seen);
            next.run(ctx)
        }
    }

    fn ctx() -> Context {
        Context::new(http::Request::new(Bytes::new()), Params::new())
    }

    fn echo_seen() -> Handler {
        Handler::new(|ctx: &mut Context| {
            let seen = ctx.get("seen").and_then(|v| v.as_str()).unwrap_or("").to_string();
            ApiResponse::ok(format!("{seen}H"))
        })
    }

    #[test]
    fn test_next_without_middleware_calls_handler() {
        let handler = echo_seen();
        let next = Next::new(&[], &handler);
        assert_eq!(next.remaining(), 0);
        assert_eq!(next.run(&mut ctx()).message, "H");
    }

    #[test]
    fn test_next_runs_in_order() {
        let chain: Vec<BoxedMiddleware> = vec![
            Arc::new(Recording { name: "A" }),
            Arc::new(Recording { name: "B" }),
        ];
        let handler = echo_seen();

        let resp = Next::new(&chain, &handler).run(&mut ctx());
        assert_eq!(resp.message, "ABH");
    }

    #[test]
    fn test_from_fn_short_circuit() {
        let chain: Vec<BoxedMiddleware> = vec![
            Arc::new(from_fn("deny", |ctx, _next| {
                ctx.error_json("denied", None, 403)
            })),
            Arc::new(Recording { name: "B" }),
        ];
        let handler = echo_seen();
        let mut ctx = ctx();

        let resp = Next::new(&chain, &handler).run(&mut ctx);
        assert_eq!(resp.code, 403);
        assert_eq!(ctx.get("seen"), None);
    }

    #[test]
    fn test_fn_middleware_name() {
        let mw = from_fn("timing", |ctx, next| next.run(ctx));
        assert_eq!(mw.name(), "timing");
    }
}
