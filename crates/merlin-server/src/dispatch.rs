//! Request dispatch.
//!
//! For each request the [`Dispatcher`]:
//!
//! 1. Resolves the method and path through the router. Unmatched requests
//!    get the not-found handler (or a 405 when enabled) and run no middleware.
//! 2. Builds the chain: global middleware, then conditional middleware whose
//!    scope matches the path, then the middleware of the route's group and
//!    its ancestors, outermost group first.
//! 3. Runs the chain around the route handler with a fresh [`Context`].
//! 4. Writes the returned envelope as JSON if nothing else wrote a response.
//!
//! The dispatcher is immutable; share it behind an `Arc` across threads.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response};
use merlin_core::{ApiResponse, Context, Handler, Params};
use merlin_middleware::{BoxedMiddleware, Next};
use merlin_router::{Router, Scope};

/// Index of a group in the registry.
pub(crate) type GroupId = usize;

/// What the router stores for each registered pattern.
pub(crate) struct Route {
    pub(crate) handler: Handler,
    pub(crate) group: Option<GroupId>,
}

/// A group's prefix, parent and own middleware.
pub(crate) struct GroupScope {
    pub(crate) prefix: String,
    pub(crate) parent: Option<GroupId>,
    pub(crate) middleware: Vec<BoxedMiddleware>,
}

/// Middleware gated on a path scope.
pub(crate) struct Conditional {
    pub(crate) scope: Scope,
    pub(crate) middleware: BoxedMiddleware,
}

/// Everything registered on a server.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) router: Router<Route>,
    pub(crate) global: Vec<BoxedMiddleware>,
    pub(crate) conditional: Vec<Conditional>,
    pub(crate) groups: Vec<GroupScope>,
    pub(crate) not_found: Option<Handler>,
}

impl Registry {
    /// Resolves a route to its handler and parameters.
    pub(crate) fn find_handler(&self, method: &Method, path: &str) -> Option<(&Handler, Params)> {
        self.router
            .find(method, path)
            .map(|matched| (&matched.value.handler, matched.params))
    }

    /// Builds the middleware list for a request, outermost first.
    pub(crate) fn chain_for(&self, path: &str, group: Option<GroupId>) -> Vec<BoxedMiddleware> {
        let mut chain = self.global.clone();
        chain.extend(
            self.conditional
                .iter()
                .filter(|c| c.scope.matches(path))
                .map(|c| Arc::clone(&c.middleware)),
        );

        let mut lineage = Vec::new();
        let mut current = group.and_then(|id| self.groups.get(id));
        while let Some(scope) = current {
            lineage.push(scope);
            current = scope.parent.and_then(|id| self.groups.get(id));
        }
        for scope in lineage.into_iter().rev() {
            chain.extend(scope.middleware.iter().cloned());
        }
        chain
    }

    pub(crate) fn prefix_of(&self, group: GroupId) -> &str {
        self.groups.get(group).map_or("", |scope| scope.prefix.as_str())
    }
}

/// Frozen routing table and middleware, ready to serve requests.
///
/// Built by [`Server::into_dispatcher`](crate::Server::into_dispatcher).
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use merlin_core::{ApiResponse, Context};
/// use merlin_server::{Server, ServerConfig};
///
/// let mut server = Server::new(ServerConfig::default());
/// server
///     .get("/users/:id", |ctx: &mut Context| {
///         let id = ctx.param("id").unwrap_or_default().to_string();
///         ApiResponse::ok(format!("user {id}"))
///     })
///     .unwrap();
///
/// let dispatcher = server.into_dispatcher();
/// let request = http::Request::get("/users/42").body(Bytes::new()).unwrap();
/// let response = dispatcher.dispatch(request);
///
/// assert_eq!(response.status(), 200);
/// assert_eq!(
///     response.body().as_ref(),
///     br#"{"success":true,"message":"user 42","code":200}"#
/// );
/// ```
pub struct Dispatcher {
    registry: Registry,
    max_body_bytes: usize,
    method_not_allowed: bool,
}

impl Dispatcher {
    pub(crate) fn new(registry: Registry, max_body_bytes: usize, method_not_allowed: bool) -> Self {
        Self {
            registry,
            max_body_bytes,
            method_not_allowed,
        }
    }

    /// Handles one request synchronously and returns the response.
    pub fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let Some(matched) = self.registry.router.find(&parts.method, &path) else {
            let ctx = Context::from_parts(parts, body, Params::new())
                .with_max_body_bytes(self.max_body_bytes);
            return self.unmatched(ctx);
        };

        let route = matched.value;
        let chain = self.registry.chain_for(&path, route.group);
        let mut ctx = Context::from_parts(parts, body, matched.params)
            .with_max_body_bytes(self.max_body_bytes);

        let resp = Next::new(&chain, &route.handler).run(&mut ctx);
        complete(&mut ctx, &resp);
        ctx.into_response()
    }

    /// Looks up a route without running it.
    #[must_use]
    pub fn find_handler(&self, method: &Method, path: &str) -> Option<(&Handler, Params)> {
        self.registry.find_handler(method, path)
    }

    /// Returns the request body ceiling passed to each [`Context`].
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.registry.router.len()
    }

    fn unmatched(&self, mut ctx: Context) -> Response<Bytes> {
        if self.method_not_allowed {
            let allowed = self.registry.router.allowed_methods(ctx.path());
            if !allowed.is_empty() {
                tracing::debug!(
                    http.method = %ctx.method(),
                    http.path = %ctx.path(),
                    "method not allowed"
                );
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    ctx.set_header(header::ALLOW, value);
                }
                ctx.error_json("Method Not Allowed", None, 405);
                return ctx.into_response();
            }
        }

        tracing::debug!(http.method = %ctx.method(), http.path = %ctx.path(), "no route matched");
        match &self.registry.not_found {
            Some(handler) => {
                let resp = handler.call(&mut ctx);
                complete(&mut ctx, &resp);
            }
            None => {
                ctx.error_json("Not Found", None, 404);
            }
        }
        ctx.into_response()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.registry.router.len())
            .field("global", &self.registry.global.len())
            .field("conditional", &self.registry.conditional.len())
            .field("groups", &self.registry.groups.len())
            .field("max_body_bytes", &self.max_body_bytes)
            .field("method_not_allowed", &self.method_not_allowed)
            .finish()
    }
}

/// Writes the envelope when nothing in the chain wrote a response.
fn complete(ctx: &mut Context, resp: &ApiResponse) {
    if !ctx.is_handled() {
        ctx.respond(resp);
    }
}
