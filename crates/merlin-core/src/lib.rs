//! # Merlin Core
//!
//! Request-scoped types shared by every Merlin crate.
//!
//! - [`Context`] - per-request carrier with params, values, extensions and the write-once response
//! - [`ApiResponse`] - the success/message/code/details envelope every handler returns
//! - [`Handler`] - type-erased synchronous route handler
//! - [`BindError`] - body, form and query binding failures
//! - [`SetCookie`] - `Set-Cookie` header builder
//!
//! # Example
//!
//! ```
//! use merlin_core::{ApiResponse, Context, Handler};
//! use merlin_router::Params;
//! use bytes::Bytes;
//!
//! let handler = Handler::new(|ctx: &mut Context| {
//!     match ctx.param("id") {
//!         Some(id) => ApiResponse::ok(format!("user {id}")),
//!         None => ctx.error_json("missing id", None, 400),
//!     }
//! });
//!
//! let mut params = Params::new();
//! params.push("id", "7");
//! let mut ctx = Context::new(http::Request::new(Bytes::new()), params);
//!
//! let resp = handler.call(&mut ctx);
//! assert_eq!(resp.message, "user 7");
//! ```

#![doc(html_root_url = "https://docs.rs/merlin-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bind;
mod context;
mod cookie;
mod error;
mod handler;
mod response;

pub use context::{Context, RequestId, DEFAULT_MAX_BODY_BYTES};
pub use cookie::{SameSite, SetCookie};
pub use error::BindError;
pub use handler::{Handler, IntoHandler};
pub use response::{content_type, detect_content_type, sniff_content_type, ApiResponse};

pub use merlin_router::Params;
