//! Route handler type.
//!
//! A handler is any `Fn(&mut Context) -> ApiResponse` that is safe to share
//! across threads. Handlers run synchronously on the request's thread and
//! either write through a [`Context`] helper or return an envelope for the
//! dispatcher to write.

use std::fmt;
use std::sync::Arc;

use crate::{ApiResponse, Context};

/// A shareable, type-erased route handler.
///
/// # Example
///
/// ```
/// use merlin_core::{ApiResponse, Context, Handler};
///
/// let handler = Handler::new(|ctx: &mut Context| {
///     let id = ctx.param("id").unwrap_or("unknown").to_string();
///     ctx.string(200, format!("user {id}"))
/// });
/// # let _ = handler;
/// ```
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&mut Context) -> ApiResponse + Send + Sync>);

impl Handler {
    /// Wraps a closure or function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> ApiResponse + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the handler.
    pub fn call(&self, ctx: &mut Context) -> ApiResponse {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Conversion into a [`Handler`].
///
/// Implemented for [`Handler`] itself and for every matching closure, so
/// registration methods accept either.
pub trait IntoHandler {
    /// Performs the conversion.
    fn into_handler(self) -> Handler;
}

impl IntoHandler for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

impl<F> IntoHandler for F
where
    F: Fn(&mut Context) -> ApiResponse + Send + Sync + 'static,
{
    fn into_handler(self) -> Handler {
        Handler::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use merlin_router::Params;

    fn ctx() -> Context {
        Context::new(http::Request::new(Bytes::new()), Params::new())
    }

    fn hello(ctx: &mut Context) -> ApiResponse {
        ctx.string(200, "hello")
    }

    #[test]
    fn test_fn_item_into_handler() {
        let handler = hello.into_handler();
        let mut ctx = ctx();
        let resp = handler.call(&mut ctx);
        assert_eq!(resp.message, "hello");
        assert!(ctx.is_handled());
    }

    #[test]
    fn test_handler_into_handler_is_identity() {
        let handler = Handler::new(|_ctx: &mut Context| ApiResponse::ok("returned"));
        let again = handler.clone().into_handler();
        let resp = again.call(&mut ctx());
        assert_eq!(resp, ApiResponse::ok("returned"));
    }

    #[test]
    fn test_returned_envelope_does_not_write() {
        let handler = Handler::new(|_ctx: &mut Context| ApiResponse::ok("returned"));
        let mut ctx = ctx();
        handler.call(&mut ctx);
        assert!(!ctx.is_handled());
    }
}
