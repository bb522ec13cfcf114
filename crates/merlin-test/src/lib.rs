//! # Merlin Test
//!
//! In-memory testing for Merlin applications. A [`TestClient`] wraps a
//! frozen [`Dispatcher`](merlin_server::Dispatcher) and runs requests
//! through the full middleware chain without binding a port.
//!
//! ## Example
//!
//! ```
//! use merlin_core::{ApiResponse, Context};
//! use merlin_server::{Server, ServerConfig};
//! use merlin_test::TestClient;
//! use serde_json::json;
//!
//! let mut server = Server::new(ServerConfig::default());
//! server
//!     .post("/users", |ctx: &mut Context| {
//!         let body: serde_json::Value = ctx.bind_json().unwrap_or_default();
//!         ctx.json(true, "created", Some(body), 201)
//!     })
//!     .unwrap();
//!
//! let client = TestClient::from_server(server);
//! let response = client.post("/users").json(&json!({"name": "Alice"})).send();
//!
//! response.assert_status(201);
//! assert_eq!(response.envelope().unwrap().details, Some(json!({"name": "Alice"})));
//! ```

#![doc(html_root_url = "https://docs.rs/merlin-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::{TestClient, TestRequestBuilder};
pub use error::TestClientError;
pub use response::TestResponse;
