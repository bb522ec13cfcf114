//! Per-request context.
//!
//! A [`Context`] is created by the dispatcher for every matched request and
//! dropped when the response has been produced. It owns:
//!
//! - the request head and buffered body
//! - the path parameters bound by the router
//! - a lazily allocated string-keyed value map for middleware-to-handler data
//! - typed extensions
//! - the response being built, guarded by the handled flag
//!
//! Every response-producing method checks and sets the handled flag, so the
//! first write wins and later writes are silent no-ops.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use merlin_router::Params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cookie::{find_cookie, SetCookie};
use crate::response::{
    content_type, detect_content_type, sniff_content_type, status_or_500, ApiResponse,
};

/// Default ceiling applied by the body binders (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use merlin_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID sent by a client or upstream proxy.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The response under construction.
#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Per-request carrier passed to every middleware and handler.
///
/// # Example
///
/// ```
/// use merlin_core::Context;
/// use merlin_router::Params;
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.push("id", "42");
///
/// let request = http::Request::builder()
///     .uri("/users/42")
///     .body(Bytes::new())
///     .unwrap();
/// let mut ctx = Context::new(request, params);
///
/// assert_eq!(ctx.param("id"), Some("42"));
/// ctx.set("user", "alice");
/// assert_eq!(ctx.get("user"), Some(&serde_json::json!("alice")));
///
/// ctx.string(200, "first");
/// ctx.string(500, "second");
/// assert_eq!(ctx.response_body().as_ref(), b"first");
/// ```
pub struct Context {
    parts: Parts,
    body: Bytes,
    params: Params,
    values: Option<HashMap<String, Value>>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    started_at: Instant,
    max_body_bytes: usize,
    response: ResponseState,
    handled: bool,
}

impl Context {
    /// Creates a context for a buffered request and its route parameters.
    #[must_use]
    pub fn new(request: Request<Bytes>, params: Params) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, body, params)
    }

    /// Creates a context from an already split request.
    #[must_use]
    pub fn from_parts(parts: Parts, body: Bytes, params: Params) -> Self {
        Self {
            parts,
            body,
            params,
            values: None,
            extensions: HashMap::new(),
            started_at: Instant::now(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            response: ResponseState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            },
            handled: false,
        }
    }

    /// Sets the body ceiling enforced by the binders.
    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Returns the body ceiling enforced by the binders.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    // ------------------------------------------------------------------
    // Request access
    // ------------------------------------------------------------------

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns a request header as a string.
    ///
    /// Headers that are absent or not valid visible ASCII return `None`.
    #[must_use]
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the first value of a query parameter, percent-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(self.query_string()?).ok()?;
        pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns a request cookie value by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| find_cookie(v, name))
    }

    /// Returns the time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    // ------------------------------------------------------------------
    // Route parameters
    // ------------------------------------------------------------------

    /// Returns a path parameter bound by the router.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns all path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    // ------------------------------------------------------------------
    // Key/value store
    // ------------------------------------------------------------------

    /// Stores a value under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    ///
    /// A stored `null` is `Some(&Value::Null)`, distinct from an absent key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.as_ref()?.get(key)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.as_mut()?.remove(key)
    }

    // ------------------------------------------------------------------
    // Typed extensions
    // ------------------------------------------------------------------

    /// Stores a typed value, replacing any previous value of the same type.
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns the stored value of type `T`.
    #[must_use]
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    // ------------------------------------------------------------------
    // Response state
    // ------------------------------------------------------------------

    /// Returns true once a response has been written.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Returns the response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    /// Returns the response body.
    #[must_use]
    pub fn response_body(&self) -> &Bytes {
        &self.response.body
    }

    /// Sets a response header, replacing existing values.
    ///
    /// Ignored once the response is handled.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.handled {
            self.response.headers.insert(name, value);
        }
    }

    /// Appends a response header value.
    ///
    /// Ignored once the response is handled.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.handled {
            self.response.headers.append(name, value);
        }
    }

    /// Appends a `Set-Cookie` header.
    ///
    /// Returns false if the cookie does not form a valid header value or the
    /// response is already handled.
    pub fn set_cookie(&mut self, cookie: &SetCookie) -> bool {
        if self.handled {
            return false;
        }
        match HeaderValue::try_from(cookie.to_string()) {
            Ok(value) => {
                self.response.headers.append(header::SET_COOKIE, value);
                true
            }
            Err(_) => false,
        }
    }

    /// Writes the response once.
    ///
    /// Returns false, leaving the response untouched, when it was already
    /// handled. Headers set earlier are kept; `Content-Type` is replaced when
    /// one is given.
    pub fn write(
        &mut self,
        status: StatusCode,
        content_type: Option<&str>,
        body: impl Into<Bytes>,
    ) -> bool {
        if self.handled {
            return false;
        }
        if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
            self.response.headers.insert(header::CONTENT_TYPE, value);
        }
        self.response.status = status;
        self.response.body = body.into();
        self.handled = true;
        true
    }

    // ------------------------------------------------------------------
    // Response helpers
    // ------------------------------------------------------------------

    /// Writes the envelope as `application/json` with `code` as the status.
    pub fn json(
        &mut self,
        success: bool,
        message: impl Into<String>,
        details: Option<Value>,
        code: u16,
    ) -> ApiResponse {
        let resp = ApiResponse {
            success,
            message: message.into(),
            details,
            code,
        };
        self.respond(&resp);
        resp
    }

    /// Writes a failed envelope as JSON.
    pub fn error_json(
        &mut self,
        message: impl Into<String>,
        details: Option<Value>,
        code: u16,
    ) -> ApiResponse {
        self.json(false, message, details, code)
    }

    /// Writes an existing envelope as JSON. Returns whether it was written.
    pub fn respond(&mut self, resp: &ApiResponse) -> bool {
        self.write(resp.status(), Some(content_type::JSON), resp.to_json_bytes())
    }

    /// Writes `text/plain`. The envelope message is the text itself.
    pub fn string(&mut self, code: u16, text: impl Into<String>) -> ApiResponse {
        let text = text.into();
        self.write(status_or_500(code), Some(content_type::TEXT), text.clone());
        ApiResponse::new(true, text, code)
    }

    /// Writes `text/html`.
    pub fn html(&mut self, code: u16, html: impl Into<String>) -> ApiResponse {
        let html: String = html.into();
        self.write(status_or_500(code), Some(content_type::HTML), html);
        ApiResponse::new(true, "HTML written", code)
    }

    /// Writes raw bytes with the given content type.
    pub fn blob(&mut self, code: u16, data: impl Into<Bytes>, content_type: &str) -> ApiResponse {
        self.write(status_or_500(code), Some(content_type), data);
        ApiResponse::new(true, "Blob written", code)
    }

    /// Redirects to `location` with `code` (usually 301, 302, 303, 307 or 308).
    pub fn redirect(&mut self, code: u16, location: &str) -> ApiResponse {
        if self.handled {
            return ApiResponse::new(true, format!("Redirected to {location}"), code);
        }
        let Ok(value) = HeaderValue::from_str(location) else {
            return self.error_json("Invalid redirect location", Some(Value::from(location)), 500);
        };
        self.response.headers.insert(header::LOCATION, value);
        self.write(status_or_500(code), None, Bytes::new());
        ApiResponse::new(true, format!("Redirected to {location}"), code)
    }

    /// Serves a file from disk.
    ///
    /// The content type comes from the file extension, or from the leading
    /// bytes when the extension is unknown. A missing file writes a 404 JSON
    /// envelope.
    pub fn file(&mut self, path: impl AsRef<Path>) -> ApiResponse {
        let path = path.as_ref();
        if self.handled {
            return ApiResponse::ok(format!("Served file {}", path.display()));
        }
        match std::fs::read(path) {
            Ok(data) => {
                let mime = match detect_content_type(path) {
                    content_type::OCTET_STREAM => sniff_content_type(&data),
                    known => known,
                };
                self.write(StatusCode::OK, Some(mime), data);
                ApiResponse::ok(format!("Served file {}", path.display()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.error_json("File not found", None, 404)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read file");
                self.error_json("Failed to read file", None, 500)
            }
        }
    }

    /// Writes a status with an empty body.
    pub fn no_content(&mut self, code: u16) -> ApiResponse {
        self.write(status_or_500(code), None, Bytes::new());
        ApiResponse::new(true, "No content", code)
    }

    /// Consumes the context and produces the HTTP response.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.response.body);
        *response.status_mut() = self.response.status;
        *response.headers_mut() = self.response.headers;
        response
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("params", &self.params)
            .field("handled", &self.handled)
            .field("status", &self.response.status)
            .finish_non_exhaustive()
    }
}
