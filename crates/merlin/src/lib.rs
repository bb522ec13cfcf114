//! # Merlin
//!
//! **Path routing and middleware dispatch for synchronous HTTP handlers**
//!
//! - **Patterns** with literal and `:param` segments, matched segment for segment
//! - **Middleware** composed outermost first: global, then path-conditional, then group
//! - **Groups** sharing a prefix and their own middleware, nestable
//! - **Write-once responses** through a per-request [`Context`](core::Context)
//! - **Stock middleware** for recovery, request IDs, logging, CORS, CSRF, bearer tokens and validation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use merlin::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("MERLIN").load()?;
//!     init_logging(&config.log_config())?;
//!
//!     let mut server = Server::new(config.server_config());
//!     server.use_middleware(recovery());
//!     server.use_middleware(RequestIdMiddleware::new());
//!     server.use_middleware(logger());
//!     server.use_if("/api/*", cors())?;
//!
//!     server.get("/users/:id", |ctx: &mut Context| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ApiResponse::ok("user").with_details(serde_json::json!({ "id": id }))
//!     })?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Request → route lookup ─ miss → 404 (or 405 with Allow), no middleware
//!              │ hit
//!              ▼
//!   global → conditional → group (outer → inner) → handler
//!              │
//!              ▼
//!   unhandled envelope written as JSON → Response
//! ```

#![doc(html_root_url = "https://docs.rs/merlin/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use merlin_core as core;

// Re-export server types
pub use merlin_server as server;

// Re-export middleware types
pub use merlin_middleware as middleware;

// Re-export router types
pub use merlin_router as router;

// Re-export logging setup
pub use merlin_telemetry as telemetry;

// Re-export configuration loading
pub use merlin_config as config;

/// Prelude module for convenient imports.
///
/// ```rust
/// use merlin::prelude::*;
///
/// let mut server = Server::new(ServerConfig::default());
/// server.get("/", |_ctx: &mut Context| ApiResponse::ok("hello")).unwrap();
/// ```
pub mod prelude {
    pub use merlin_core::{
        content_type, ApiResponse, BindError, Context, Handler, IntoHandler, Params, RequestId,
        SameSite, SetCookie,
    };

    pub use merlin_middleware::stages::{
        cors, cors_with_config, csrf, csrf_with_config, jwt, logger, recovery, validate_json,
        CorsConfig, CsrfConfig, RequestIdMiddleware, TokenError, TokenVerifier,
    };
    pub use merlin_middleware::{from_fn, Chain, Middleware, Next};

    pub use merlin_router::{RouteError, Router, Scope};

    pub use merlin_server::{
        Dispatcher, Group, Server, ServerConfig, ServerError, ShutdownSignal,
    };

    pub use merlin_config::{ConfigError, ConfigLoader, MerlinConfig};
    pub use merlin_telemetry::{init_logging, LogConfig, LogFormat, TelemetryError};
}
