//! Panic recovery middleware.
//!
//! Catches a panic anywhere further down the chain, logs it, and writes a
//! `500` envelope unless a response was already written before the panic.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use merlin_core::{ApiResponse, Context};

use crate::middleware::{Middleware, Next};

/// Message written for a recovered panic.
pub const PANIC_MESSAGE: &str = "Internal Server Error";

/// Middleware that turns panics into `500` responses.
///
/// Place it first so it wraps everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

impl Recovery {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        let path = ctx.path().to_string();
        match panic::catch_unwind(AssertUnwindSafe(|| next.run(ctx))) {
            Ok(resp) => resp,
            Err(payload) => {
                tracing::error!(
                    http.path = %path,
                    panic = %panic_message(payload.as_ref()),
                    "recovered from panic"
                );
                ctx.error_json(PANIC_MESSAGE, None, 500)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Panic recovery middleware.
#[must_use]
pub const fn recovery() -> Recovery {
    Recovery::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use merlin_core::{Handler, Params};

    fn ctx() -> Context {
        Context::new(http::Request::new(Bytes::new()), Params::new())
    }

    #[test]
    fn test_panic_becomes_500() {
        let handler = Handler::new(|_ctx: &mut Context| panic!("boom"));
        let mut ctx = ctx();

        let resp = recovery().process(&mut ctx, Next::new(&[], &handler));
        assert_eq!(resp, ApiResponse::error(PANIC_MESSAGE, 500));
        assert_eq!(ctx.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_panic_after_write_keeps_response() {
        let handler = Handler::new(|ctx: &mut Context| {
            ctx.string(202, "partial");
            panic!("late failure");
        });
        let mut ctx = ctx();

        recovery().process(&mut ctx, Next::new(&[], &handler));
        assert_eq!(ctx.status(), http::StatusCode::ACCEPTED);
        assert_eq!(ctx.response_body().as_ref(), b"partial");
    }

    #[test]
    fn test_no_panic_passes_through() {
        let handler = Handler::new(|_ctx: &mut Context| ApiResponse::ok("fine"));
        let resp = recovery().process(&mut ctx(), Next::new(&[], &handler));
        assert_eq!(resp.message, "fine");
    }

    #[test]
    fn test_panic_message() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let fixed: Box<dyn Any + Send> = Box::new("fixed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(fixed.as_ref()), "fixed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
