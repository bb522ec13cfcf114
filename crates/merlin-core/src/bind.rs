//! Typed request binding.
//!
//! Decoding goes through serde derives on the target type, and validation
//! through `validator` derives, so there is no runtime field discovery.
//!
//! ```
//! use merlin_core::Context;
//! use merlin_router::Params;
//! use bytes::Bytes;
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct CreateUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//! }
//!
//! let request = http::Request::builder()
//!     .method("POST")
//!     .header("content-type", "application/json")
//!     .body(Bytes::from_static(br#"{"name": "Alice"}"#))
//!     .unwrap();
//! let ctx = Context::new(request, Params::new());
//!
//! let user: CreateUser = ctx.bind_json().unwrap();
//! ctx.validate(&user).unwrap();
//! assert_eq!(user.name, "Alice");
//! ```

use http::header;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::response::content_type;
use crate::{BindError, Context};

impl Context {
    /// Decodes a JSON body.
    ///
    /// A `Content-Type` header, when present, must be `application/json`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        let body = self.checked_body(content_type::JSON)?;
        Ok(serde_json::from_slice(body)?)
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        let body = self.checked_body(content_type::FORM)?;
        serde_urlencoded::from_bytes(body).map_err(BindError::Form)
    }

    /// Decodes the query string. A missing query string decodes as empty.
    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        serde_urlencoded::from_str(self.query_string().unwrap_or("")).map_err(BindError::Query)
    }

    /// Runs the validation rules derived on `T`.
    pub fn validate<T: Validate>(&self, value: &T) -> Result<(), BindError> {
        value.validate().map_err(BindError::Validation)
    }

    fn checked_body(&self, expected: &'static str) -> Result<&[u8], BindError> {
        if let Some(raw) = self.headers().get(header::CONTENT_TYPE) {
            let raw = raw.to_str().map_err(|_| {
                BindError::InvalidContentType(String::from_utf8_lossy(raw.as_bytes()).into_owned())
            })?;
            let media_type = media_type(raw)?;
            if media_type != expected {
                return Err(BindError::UnexpectedContentType {
                    expected,
                    actual: media_type,
                });
            }
        }

        let body = self.body();
        if body.is_empty() {
            return Err(BindError::EmptyBody);
        }
        if body.len() > self.max_body_bytes() {
            return Err(BindError::PayloadTooLarge {
                limit: self.max_body_bytes(),
                actual: body.len(),
            });
        }
        Ok(body)
    }
}

/// Extracts the lowercased media type from a `Content-Type` value.
fn media_type(raw: &str) -> Result<String, BindError> {
    let essence = raw.split(';').next().unwrap_or("").trim();
    match essence.split_once('/') {
        Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() && !sub.contains('/') => {
            Ok(essence.to_ascii_lowercase())
        }
        _ => Err(BindError::InvalidContentType(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use merlin_router::Params;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        username: String,
        remember: Option<bool>,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(range(min = 18))]
        age: u32,
    }

    fn ctx(content_type: Option<&str>, uri: &str, body: &'static [u8]) -> Context {
        let mut builder = http::Request::builder().method("POST").uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        Context::new(builder.body(Bytes::from_static(body)).unwrap(), Params::new())
    }

    #[test]
    fn test_bind_json() {
        let ctx = ctx(
            Some("application/json; charset=utf-8"),
            "/",
            br#"{"username":"alice","remember":true}"#,
        );
        let login: Login = ctx.bind_json().unwrap();
        assert_eq!(login.username, "alice");
        assert_eq!(login.remember, Some(true));
    }

    #[test]
    fn test_bind_json_without_content_type() {
        let ctx = ctx(None, "/", br#"{"username":"bob"}"#);
        let login: Login = ctx.bind_json().unwrap();
        assert_eq!(login.username, "bob");
    }

    #[test]
    fn test_bind_json_wrong_content_type() {
        let ctx = ctx(Some("text/plain"), "/", br#"{"username":"bob"}"#);
        let err = ctx.bind_json::<Login>().unwrap_err();
        assert!(matches!(err, BindError::UnexpectedContentType { ref actual, .. } if actual == "text/plain"));
    }

    #[test]
    fn test_bind_json_malformed_content_type() {
        let ctx = ctx(Some("json"), "/", b"{}");
        assert!(matches!(
            ctx.bind_json::<Login>(),
            Err(BindError::InvalidContentType(_))
        ));
    }

    #[test]
    fn test_bind_json_empty_body() {
        let ctx = ctx(Some("application/json"), "/", b"");
        assert!(matches!(ctx.bind_json::<Login>(), Err(BindError::EmptyBody)));
    }

    #[test]
    fn test_bind_json_too_large() {
        let ctx = ctx(Some("application/json"), "/", br#"{"username":"alice"}"#).with_max_body_bytes(4);
        assert!(matches!(
            ctx.bind_json::<Login>(),
            Err(BindError::PayloadTooLarge { limit: 4, .. })
        ));
    }

    #[test]
    fn test_bind_json_invalid() {
        let ctx = ctx(Some("application/json"), "/", b"{not json");
        assert!(matches!(ctx.bind_json::<Login>(), Err(BindError::Json(_))));
    }

    #[test]
    fn test_bind_form() {
        let ctx = ctx(
            Some("application/x-www-form-urlencoded"),
            "/",
            b"username=alice+smith&remember=false",
        );
        let login: Login = ctx.bind_form().unwrap();
        assert_eq!(login.username, "alice smith");
        assert_eq!(login.remember, Some(false));
    }

    #[test]
    fn test_bind_query() {
        let ctx = ctx(None, "/login?username=carol", b"");
        let login: Login = ctx.bind_query().unwrap();
        assert_eq!(login.username, "carol");
        assert_eq!(login.remember, None);

        let missing = self::ctx(None, "/login", b"");
        assert!(matches!(missing.bind_query::<Login>(), Err(BindError::Query(_))));
    }

    #[test]
    fn test_validate() {
        let ctx = ctx(None, "/", b"");
        let good = Signup {
            email: "a@example.com".into(),
            age: 30,
        };
        assert!(ctx.validate(&good).is_ok());

        let bad = Signup {
            email: "nope".into(),
            age: 3,
        };
        let err = ctx.validate(&bad).unwrap_err();
        let details = err.details();
        assert!(details.get("email").is_some());
        assert!(details.get("age").is_some());
    }
}
