//! # Merlin Server
//!
//! Request dispatch and the HTTP host layer.
//!
//! - [`Server`] - registration API: routes, groups, global and conditional middleware
//! - [`Group`] - prefix- and middleware-scoped route registration
//! - [`Dispatcher`] - frozen routing table that runs one request synchronously
//! - [`ServerConfig`] - bind address, timeouts, body ceiling, 405 behaviour
//! - [`ShutdownSignal`] - graceful shutdown
//!
//! ## Middleware Order
//!
//! ```text
//! global (registration order)
//!   → conditional whose scope matches the path (registration order)
//!     → outer group → inner group
//!       → route handler
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use merlin_core::{ApiResponse, Context};
//! use merlin_middleware::stages;
//! use merlin_server::{Server, ServerConfig};
//!
//! let mut server = Server::new(ServerConfig::default());
//! server.use_middleware(stages::recovery());
//! server.use_if("/api/*", stages::RequestIdMiddleware::new()).unwrap();
//!
//! let mut api = server.group("/api");
//! api.get("/health", |_ctx: &mut Context| ApiResponse::ok("up")).unwrap();
//!
//! let dispatcher = server.into_dispatcher();
//! let response = dispatcher.dispatch(http::Request::get("/api/health").body(Bytes::new()).unwrap());
//! assert_eq!(response.status(), 200);
//! assert!(response.headers().contains_key("x-request-id"));
//! ```

#![doc(html_root_url = "https://docs.rs/merlin-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod dispatch;
mod error;
mod group;
mod server;
pub mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use dispatch::Dispatcher;
pub use error::ServerError;
pub use group::Group;
pub use server::{HttpResponse, ResponseBody, Server};
pub use shutdown::{InFlight, InFlightGuard, ShutdownSignal};
