//! Route groups.
//!
//! A group is a path prefix with its own middleware, layered inside the
//! server's global and conditional middleware. Groups nest; a nested group's
//! routes run the parent group's middleware outside its own.
//!
//! Group middleware is looked up when a request is dispatched, so middleware
//! added after a route was registered still applies to it.

use std::sync::Arc;

use http::Method;
use merlin_core::IntoHandler;
use merlin_middleware::Middleware;
use merlin_router::RouteError;

use crate::dispatch::{GroupId, GroupScope, Registry, Route};

/// A prefix- and middleware-scoped view over the server's routes.
///
/// # Example
///
/// ```rust
/// use merlin_core::{ApiResponse, Context};
/// use merlin_middleware::from_fn;
/// use merlin_server::{Server, ServerConfig};
///
/// let mut server = Server::new(ServerConfig::default());
/// let mut admin = server.group("/admin");
/// admin.use_middleware(from_fn("audit", |ctx, next| next.run(ctx)));
/// admin.get("/stats", |_ctx: &mut Context| ApiResponse::ok("stats")).unwrap();
///
/// let mut reports = admin.group("/reports");
/// reports.get("/:year", |_ctx: &mut Context| ApiResponse::ok("report")).unwrap();
///
/// let dispatcher = server.into_dispatcher();
/// assert_eq!(dispatcher.route_count(), 2);
/// ```
pub struct Group<'s> {
    registry: &'s mut Registry,
    id: GroupId,
}

impl<'s> Group<'s> {
    pub(crate) fn create(registry: &'s mut Registry, prefix: &str, parent: Option<GroupId>) -> Self {
        let base = parent.map_or("", |id| registry.prefix_of(id));
        let prefix = join_prefix(base, prefix);
        let id = registry.groups.len();
        registry.groups.push(GroupScope {
            prefix,
            parent,
            middleware: Vec::new(),
        });
        Self { registry, id }
    }

    /// Returns the full prefix, including any parent prefixes.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.registry.prefix_of(self.id)
    }

    /// Adds middleware run for every route in this group and its subgroups.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        if let Some(scope) = self.registry.groups.get_mut(self.id) {
            scope.middleware.push(Arc::new(middleware));
        }
        self
    }

    /// Creates a nested group under this one.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::create(self.registry, prefix, Some(self.id))
    }

    /// Registers `prefix + path` for `method`.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: impl IntoHandler,
    ) -> Result<(), RouteError> {
        let full = join_route(self.prefix(), path)?;
        let route = Route {
            handler: handler.into_handler(),
            group: Some(self.id),
        };
        self.registry.router.handle(method, &full, route)
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
}

impl std::fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix())
            .finish_non_exhaustive()
    }
}

/// Appends a group prefix to its parent's. A prefix without a leading `/`
/// still starts a new segment.
fn join_prefix(base: &str, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let sep = if prefix.is_empty() || prefix.starts_with('/') { "" } else { "/" };
    format!("{}{sep}{prefix}", base.trim_end_matches('/'))
}

/// Appends a route path to a group prefix. An empty path or `/` names the
/// prefix itself.
fn join_route(prefix: &str, path: &str) -> Result<String, RouteError> {
    if path.is_empty() || path == "/" {
        return Ok(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        });
    }
    if !path.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash {
            pattern: path.to_string(),
        });
    }
    Ok(format!("{prefix}{path}"))
}
