//! Middleware chain builder.
//!
//! A [`Chain`] composes middleware around a handler so that the first
//! middleware added is the outermost:
//!
//! ```text
//! Chain [A, B, C] around H  ==  A(B(C(H)))
//!
//!   request  → A → B → C → H
//!   response ← A ← B ← C ← H
//! ```
//!
//! Composition is pure; building a chain runs nothing.

use std::fmt;
use std::sync::Arc;

use merlin_core::{ApiResponse, Context, Handler, IntoHandler};

use crate::middleware::{BoxedMiddleware, Middleware, Next};

/// An ordered list of middleware, outermost first.
///
/// # Example
///
/// ```
/// use merlin_core::{ApiResponse, Context};
/// use merlin_middleware::{from_fn, Chain};
/// # use merlin_core::Params;
/// # use bytes::Bytes;
///
/// let handler = Chain::new()
///     .with(from_fn("outer", |ctx, next| {
///         ctx.set("trail", "outer");
///         next.run(ctx)
///     }))
///     .then(|ctx: &mut Context| {
///         let trail = ctx.get("trail").and_then(|v| v.as_str()).unwrap_or("none");
///         ApiResponse::ok(trail)
///     });
///
/// # let mut ctx = Context::new(http::Request::new(Bytes::new()), Params::new());
/// let resp = handler.call(&mut ctx);
/// assert_eq!(resp.message, "outer");
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    middleware: Vec<BoxedMiddleware>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware as the new innermost layer.
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware as the new innermost layer.
    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.middleware.push(middleware);
    }

    /// Appends several shared middleware in order.
    pub fn extend<I>(&mut self, middleware: I)
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        self.middleware.extend(middleware);
    }

    /// Runs the chain around `handler` for one request.
    pub fn run(&self, ctx: &mut Context, handler: &Handler) -> ApiResponse {
        Next::new(&self.middleware, handler).run(ctx)
    }

    /// Freezes the chain around `handler` into a single handler.
    #[must_use]
    pub fn then(self, handler: impl IntoHandler) -> Handler {
        let handler = handler.into_handler();
        if self.middleware.is_empty() {
            return handler;
        }
        let middleware: Arc<[BoxedMiddleware]> = self.middleware.into();
        Handler::new(move |ctx: &mut Context| Next::new(&middleware, &handler).run(ctx))
    }

    /// Returns middleware names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns true if the chain has no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl FromIterator<BoxedMiddleware> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxedMiddleware>>(iter: I) -> Self {
        Self {
            middleware: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("middleware", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_fn;
    use bytes::Bytes;
    use merlin_router::Params;
    use std::sync::Mutex;

    fn ctx() -> Context {
        Context::new(http::Request::new(Bytes::new()), Params::new())
    }

    fn tracer(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> impl Middleware {
        let log = Arc::clone(log);
        from_fn(name, move |ctx, next| {
            log.lock().unwrap().push(format!("{name}:in"));
            let resp = next.run(ctx);
            log.lock().unwrap().push(format!("{name}:out"));
            resp
        })
    }

    #[test]
    fn test_order_matches_registration() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);

        let handler = Chain::new()
            .with(tracer(&log, "A"))
            .with(tracer(&log, "B"))
            .then(move |_ctx: &mut Context| {
                handler_log.lock().unwrap().push("H".to_string());
                ApiResponse::ok("done")
            });

        handler.call(&mut ctx());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["A:in", "B:in", "H", "B:out", "A:out"]
        );
    }

    #[test]
    fn test_early_return_skips_inner_layers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);

        let chain = Chain::new()
            .with(from_fn("A", |ctx, _next| ctx.error_json("stop", None, 401)))
            .with(tracer(&log, "B"));
        let handler = Handler::new(move |_ctx: &mut Context| {
            handler_log.lock().unwrap().push("H".to_string());
            ApiResponse::ok("done")
        });

        let mut ctx = ctx();
        let resp = chain.run(&mut ctx, &handler);
        assert_eq!(resp.code, 401);
        assert!(log.lock().unwrap().is_empty());
        assert!(ctx.is_handled());
    }

    #[test]
    fn test_empty_chain_is_handler() {
        let handler = Chain::new().then(|_ctx: &mut Context| ApiResponse::ok("bare"));
        assert_eq!(handler.call(&mut ctx()).message, "bare");
    }

    #[test]
    fn test_names_and_len() {
        let chain: Chain = vec![
            Arc::new(from_fn("one", |ctx, next| next.run(ctx))) as BoxedMiddleware,
            Arc::new(from_fn("two", |ctx, next| next.run(ctx))) as BoxedMiddleware,
        ]
        .into_iter()
        .collect();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.names(), vec!["one", "two"]);
        assert!(Chain::new().is_empty());
    }
}
