//! HTTP server.
//!
//! [`Server`] collects routes, groups and middleware during setup. Serving
//! freezes it into a [`Dispatcher`] shared by every connection.
//!
//! # Architecture
//!
//! - TCP listener bound to the configured address
//! - One hyper HTTP/1 connection task per client
//! - Body collected up to the configured ceiling (`413` beyond it)
//! - Dispatch on tokio's blocking pool, since handlers are synchronous
//! - Request timeout around collection and dispatch (`504` on expiry)
//! - Graceful shutdown: stop accepting, drain connections, give up after
//!   the shutdown timeout
//!
//! # Example
//!
//! ```rust,no_run
//! use merlin_core::{ApiResponse, Context};
//! use merlin_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::builder().http_addr("127.0.0.1:8080").build());
//!     server.get("/ping", |_ctx: &mut Context| ApiResponse::ok("pong"))?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use merlin_core::{ApiResponse, Handler, IntoHandler, Params};
use merlin_middleware::Middleware;
use merlin_router::{RouteError, Scope};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::dispatch::{Conditional, Dispatcher, Registry, Route};
use crate::error::ServerError;
use crate::group::Group;
use crate::shutdown::{InFlight, ShutdownSignal};

/// Type alias for the HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// The Merlin HTTP server.
///
/// Registration happens through `&mut self` before serving; nothing can be
/// registered once the server is running.
pub struct Server {
    config: ServerConfig,
    registry: Registry,
}

impl Server {
    /// Creates a server with no routes.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Registry::default(),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Adds middleware that runs for every matched route.
    ///
    /// Earlier registrations wrap later ones.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.registry.global.push(Arc::new(middleware));
        self
    }

    /// Adds middleware that runs only when the request path matches
    /// `pattern`: an exact path, or a prefix ending in `*`.
    ///
    /// Fails if `pattern` does not begin with `/` or has a `*` before its end.
    pub fn use_if(
        &mut self,
        pattern: &str,
        middleware: impl Middleware,
    ) -> Result<&mut Self, RouteError> {
        let scope = Scope::parse(pattern)?;
        self.registry.conditional.push(Conditional {
            scope,
            middleware: Arc::new(middleware),
        });
        Ok(self)
    }

    /// Registers a route.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RouteError> {
        let route = Route {
            handler: handler.into_handler(),
            group: None,
        };
        self.registry.router.handle(method, path, route)
    }

    /// Registers a GET route.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        self.handle(Method::GET, path, handler)
    }

    /// Registers a POST route.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        self.handle(Method::POST, path, handler)
    }

    /// Registers a PUT route.
    pub fn put(&mut self, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        self.handle(Method::PUT, path, handler)
    }

    /// Registers a PATCH route.
    pub fn patch(&mut self, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        self.handle(Method::PATCH, path, handler)
    }

    /// Registers a DELETE route.
    pub fn delete(&mut self, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        self.handle(Method::DELETE, path, handler)
    }

    /// Opens a route group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::create(&mut self.registry, prefix, None)
    }

    /// Replaces the handler for unmatched requests.
    ///
    /// It runs without any middleware.
    pub fn not_found(&mut self, handler: impl IntoHandler) -> &mut Self {
        self.registry.not_found = Some(handler.into_handler());
        self
    }

    /// Looks up a route without running it.
    #[must_use]
    pub fn find_handler(&self, method: &Method, path: &str) -> Option<(&Handler, Params)> {
        self.registry.find_handler(method, path)
    }

    /// Freezes registration into a [`Dispatcher`].
    #[must_use]
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(
            self.registry,
            self.config.max_body_bytes(),
            self.config.method_not_allowed(),
        )
    }

    /// Runs the server until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = bind_addr(&self.config)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let request_timeout = self.config.request_timeout();
        let shutdown_timeout = self.config.shutdown_timeout();
        let dispatcher = Arc::new(self.into_dispatcher());
        let in_flight = InFlight::new();

        tracing::info!(addr = %local_addr, routes = dispatcher.route_count(), "server listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let guard = in_flight.acquire();
                        let dispatcher = Arc::clone(&dispatcher);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(err) =
                                serve_connection(stream, dispatcher, request_timeout, shutdown).await
                            {
                                tracing::debug!(remote = %remote_addr, error = %err, "connection error");
                            }
                            drop(guard);
                        });
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to accept connection");
                    }
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            timeout = ?shutdown_timeout,
            active = in_flight.active(),
            "waiting for connections to close"
        );
        tokio::select! {
            () = in_flight.wait_idle() => tracing::info!("all connections closed"),
            () = tokio::time::sleep(shutdown_timeout) => tracing::warn!(
                active = in_flight.active(),
                "shutdown timeout reached with connections still open"
            ),
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("routes", &self.registry.router.len())
            .finish_non_exhaustive()
    }
}

async fn serve_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    request_timeout: Duration,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { Ok::<_, Infallible>(handle_request(dispatcher, req, request_timeout).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    }
}

async fn handle_request(
    dispatcher: Arc<Dispatcher>,
    req: Request<Incoming>,
    request_timeout: Duration,
) -> HttpResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let work = async move {
        let limit = dispatcher.max_body_bytes();
        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                return envelope_response(&ApiResponse::error("Payload Too Large", 413));
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read request body");
                return envelope_response(&ApiResponse::error("Failed to read request body", 400));
            }
        };

        let request = Request::from_parts(parts, body);
        match tokio::task::spawn_blocking(move || dispatcher.dispatch(request)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "dispatch task failed");
                envelope_response(&ApiResponse::error("Internal Server Error", 500))
            }
        }
    };

    let response = match tokio::time::timeout(request_timeout, work).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(http.method = %method, http.path = %path, "request timed out");
            envelope_response(&ApiResponse::error("Gateway Timeout", 504))
        }
    };
    response.map(Full::new)
}

/// Builds a JSON response from an envelope outside any [`Context`](merlin_core::Context).
fn envelope_response(resp: &ApiResponse) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(resp.to_json_bytes()));
    *response.status_mut() = resp.status();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(merlin_core::content_type::JSON),
    );
    response
}

/// Parses the configured bind address.
fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    config
        .socket_addr()
        .map_err(|source| ServerError::InvalidAddress {
            addr: config.http_addr().to_string(),
            source,
        })
}
