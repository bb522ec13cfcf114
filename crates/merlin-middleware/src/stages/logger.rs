//! Request logging middleware.
//!
//! Emits one `tracing` event per request after the rest of the chain has
//! finished, with the method, path, final status, latency and request ID.

use std::time::Instant;

use merlin_core::{ApiResponse, Context, RequestId};

use crate::middleware::{Middleware, Next};

/// Middleware that logs each completed request at `INFO`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    /// Creates the logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for Logger {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        let started = Instant::now();
        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        let resp = next.run(ctx);

        // An unhandled context is completed from the envelope later.
        let status = if ctx.is_handled() {
            ctx.status().as_u16()
        } else {
            resp.status().as_u16()
        };
        let request_id = ctx
            .extension::<RequestId>()
            .map(ToString::to_string)
            .unwrap_or_default();

        tracing::info!(
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            request_id = %request_id,
            "request completed"
        );

        resp
    }
}

/// Request logging middleware.
#[must_use]
pub const fn logger() -> Logger {
    Logger::new()
}
