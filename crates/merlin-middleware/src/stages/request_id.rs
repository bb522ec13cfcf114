//! Request ID middleware.
//!
//! Every request gets an identifier that ties together log lines and the
//! client's view of the exchange.
//!
//! ## Request ID Sources
//!
//! 1. **X-Request-ID header**: a well-formed UUID from the client is reused
//! 2. **Generated UUID v7**: otherwise a new time-ordered ID is minted
//!
//! The ID is stored as a typed [`RequestId`] extension and under the
//! `request_id` context value, and echoed in the `X-Request-ID` response
//! header.

use http::{HeaderName, HeaderValue};
use merlin_core::{ApiResponse, Context, RequestId};

use crate::middleware::{Middleware, Next};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context value key holding the request ID as a string.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Middleware that generates or propagates request IDs.
///
/// # Example
///
/// ```
/// use merlin_middleware::stages::RequestIdMiddleware;
///
/// let propagate = RequestIdMiddleware::new();
/// let always_fresh = RequestIdMiddleware::ignore_incoming();
/// # let _ = (propagate, always_fresh);
/// ```
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self {
            trust_incoming: true,
        }
    }
}

impl RequestIdMiddleware {
    /// Creates a middleware that reuses a valid incoming `X-Request-ID`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that always generates a fresh ID.
    ///
    /// Use this at the edge, where clients are not trusted to pick IDs.
    #[must_use]
    pub fn ignore_incoming() -> Self {
        Self {
            trust_incoming: false,
        }
    }

    fn extract(&self, ctx: &Context) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        ctx.header(REQUEST_ID_HEADER).and_then(RequestId::parse)
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        let request_id = self.extract(ctx).unwrap_or_default();
        let rendered = request_id.to_string();

        if let Ok(value) = HeaderValue::from_str(&rendered) {
            ctx.set_header(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        ctx.set(REQUEST_ID_KEY, rendered);
        ctx.insert_extension(request_id);

        next.run(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use merlin_core::{Handler, Params};

    const INCOMING: &str = "01890a5d-ac96-774b-bcce-b302099a8057";

    fn ctx(incoming: Option<&str>) -> Context {
        let mut builder = http::Request::builder().uri("/");
        if let Some(id) = incoming {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        Context::new(builder.body(Bytes::new()).unwrap(), Params::new())
    }

    fn run(mw: &RequestIdMiddleware, ctx: &mut Context) -> ApiResponse {
        let handler = Handler::new(|ctx: &mut Context| {
            let id = ctx.extension::<RequestId>().map(ToString::to_string).unwrap_or_default();
            ctx.string(200, id)
        });
        mw.process(ctx, Next::new(&[], &handler))
    }

    #[test]
    fn test_generates_id_when_absent() {
        let mut ctx = ctx(None);
        let resp = run(&RequestIdMiddleware::new(), &mut ctx);

        assert!(RequestId::parse(&resp.message).is_some());
        assert_eq!(ctx.response_headers()[REQUEST_ID_HEADER], resp.message.as_str());
        assert_eq!(ctx.get(REQUEST_ID_KEY).and_then(|v| v.as_str()), Some(resp.message.as_str()));
    }

    #[test]
    fn test_propagates_incoming_id() {
        let mut ctx = ctx(Some(INCOMING));
        let resp = run(&RequestIdMiddleware::new(), &mut ctx);
        assert_eq!(resp.message, INCOMING);
        assert_eq!(ctx.response_headers()[REQUEST_ID_HEADER], INCOMING);
    }

    #[test]
    fn test_malformed_incoming_id_is_replaced() {
        let mut ctx = ctx(Some("not-a-uuid"));
        let resp = run(&RequestIdMiddleware::new(), &mut ctx);
        assert_ne!(resp.message, "not-a-uuid");
        assert!(RequestId::parse(&resp.message).is_some());
    }

    #[test]
    fn test_ignore_incoming() {
        let mut ctx = ctx(Some(INCOMING));
        let resp = run(&RequestIdMiddleware::ignore_incoming(), &mut ctx);
        assert_ne!(resp.message, INCOMING);
    }
}
