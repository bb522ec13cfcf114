//! # Merlin Middleware
//!
//! The middleware contract, the chain builder that composes middleware
//! around handlers, and a set of stock middleware.
//!
//! ## Execution Model
//!
//! Middleware wrap each other like layers:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ recovery                                 │
//! │  ┌────────────────────────────────────┐  │
//! │  │ request_id                         │  │
//! │  │  ┌──────────────────────────────┐  │  │
//! │  │  │ logger                       │  │  │
//! │  │  │  ┌────────────────────────┐  │  │  │
//! │  │  │  │ handler                │  │  │  │
//! │  │  │  └────────────────────────┘  │  │  │
//! │  │  └──────────────────────────────┘  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! A middleware may act before calling [`Next::run`], after it, or not call
//! it at all to short-circuit the request.
//!
//! ## Example
//!
//! ```
//! use merlin_core::{ApiResponse, Context};
//! use merlin_middleware::{from_fn, stages, Chain};
//!
//! let handler = Chain::new()
//!     .with(stages::recovery())
//!     .with(stages::RequestIdMiddleware::new())
//!     .with(from_fn("api_version", |ctx, next| {
//!         ctx.set("api_version", 2);
//!         next.run(ctx)
//!     }))
//!     .then(|_ctx: &mut Context| ApiResponse::ok("hello"));
//! # let _ = handler;
//! ```

#![doc(html_root_url = "https://docs.rs/merlin-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;
pub mod stages;

pub use chain::Chain;
pub use middleware::{from_fn, BoxedMiddleware, FnMiddleware, Middleware, Next};
