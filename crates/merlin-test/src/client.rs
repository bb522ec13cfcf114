//! In-memory client.
//!
//! Requests are dispatched on the calling thread, exactly as the HTTP host
//! would run them on its blocking pool, minus the socket. The host's body
//! ceiling is applied before dispatch so oversized bodies see the same 413.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request};
use merlin_core::{content_type, ApiResponse};
use merlin_server::{Dispatcher, Server};
use serde::Serialize;

use crate::error::TestClientError;
use crate::response::TestResponse;

/// Drives a [`Dispatcher`] without a network.
///
/// # Example
///
/// ```
/// use merlin_core::{ApiResponse, Context};
/// use merlin_server::{Server, ServerConfig};
/// use merlin_test::TestClient;
///
/// let mut server = Server::new(ServerConfig::default());
/// server
///     .get("/users/:id", |ctx: &mut Context| {
///         let id = ctx.param("id").unwrap_or_default().to_string();
///         ApiResponse::ok(id)
///     })
///     .unwrap();
///
/// let client = TestClient::from_server(server);
/// let response = client.get("/users/42").send();
/// response.assert_status(200);
/// assert_eq!(response.envelope().unwrap().message, "42");
/// ```
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps a frozen dispatcher.
    pub fn new(dispatcher: impl Into<Arc<Dispatcher>>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
            default_headers: Vec::new(),
        }
    }

    /// Freezes `server` and wraps the result.
    pub fn from_server(server: Server) -> Self {
        Self::new(server.into_dispatcher())
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the underlying dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestRequestBuilder<'_> {
        let mut builder = TestRequestBuilder {
            client: self,
            method,
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        };
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        builder
    }

    fn execute(&self, request: Request<Bytes>) -> TestResponse {
        if request.body().len() > self.dispatcher.max_body_bytes() {
            let envelope = ApiResponse::error("Payload Too Large", 413);
            let mut response = http::Response::new(Bytes::from(envelope.to_json_bytes()));
            *response.status_mut() = envelope.status();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type::JSON),
            );
            return TestResponse::from_response(response);
        }
        TestResponse::from_response(self.dispatcher.dispatch(request))
    }
}

/// A request under construction.
///
/// Builder errors are held until [`try_send`](Self::try_send) so calls can
/// be chained.
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder<'a> {
    client: &'a TestClient,
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestClientError>,
}

impl TestRequestBuilder<'_> {
    /// Sets a header, replacing earlier values.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let (name, value) = (name.as_ref(), value.as_ref());
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(TestClientError::InvalidHeader(format!("{name}: {value}"))),
        }
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(header::AUTHORIZATION.as_str(), value)
    }

    /// Adds a `Cookie` pair.
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let pair = format!("{}={}", name.as_ref(), value.as_ref());
        let cookie = match self.headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}; {pair}"),
            None => pair,
        };
        self.header(header::COOKIE.as_str(), cookie)
    }

    /// Appends a percent-encoded query parameter.
    pub fn query(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.query
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.header(header::CONTENT_TYPE.as_str(), content_type::JSON)
            }
            Err(err) => {
                self.fail(err.into());
                self
            }
        }
    }

    /// Sets a form body and `Content-Type: application/x-www-form-urlencoded`.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => {
                self.body = Bytes::from(encoded);
                self.header(header::CONTENT_TYPE.as_str(), content_type::FORM)
            }
            Err(err) => {
                self.fail(err.into());
                self
            }
        }
    }

    /// Dispatches the request.
    pub fn try_send(self) -> Result<TestResponse, TestClientError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut uri = self.uri;
        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            let separator = if uri.contains('?') { '&' } else { '?' };
            uri = format!("{uri}{separator}{}", encoded.join("&"));
        }

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .body(self.body)?;
        *request.headers_mut() = self.headers;

        Ok(self.client.execute(request))
    }

    /// Dispatches the request, panicking on builder errors.
    #[track_caller]
    pub fn send(self) -> TestResponse {
        match self.try_send() {
            Ok(response) => response,
            Err(err) => panic!("failed to build test request: {err}"),
        }
    }

    fn fail(&mut self, err: TestClientError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
