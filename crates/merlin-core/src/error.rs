//! Body binding errors.
//!
//! [`BindError`] is returned by the `bind_*` and `validate` methods on
//! [`Context`](crate::Context). Handlers usually turn it into a JSON error
//! envelope through [`BindError::status_code`] and [`BindError::details`].

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error returned when a request cannot be decoded into a typed value.
///
/// # Example
///
/// ```
/// use merlin_core::BindError;
/// use http::StatusCode;
///
/// let err = BindError::EmptyBody;
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.to_string(), "request body is empty");
/// ```
#[derive(Debug, Error)]
pub enum BindError {
    /// The `Content-Type` header could not be parsed.
    #[error("invalid Content-Type: {0:?}")]
    InvalidContentType(String),

    /// The `Content-Type` header names a different media type.
    #[error("expected Content-Type {expected}, got {actual}")]
    UnexpectedContentType {
        /// The media type the binder accepts.
        expected: &'static str,
        /// The media type the client sent.
        actual: String,
    },

    /// There is no body to decode.
    #[error("request body is empty")]
    EmptyBody,

    /// The body is larger than the configured ceiling.
    #[error("request body of {actual} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Maximum accepted size in bytes.
        limit: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// JSON decoding failed.
    #[error("failed to decode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// Form decoding failed.
    #[error("failed to decode form body: {0}")]
    Form(#[source] serde_urlencoded::de::Error),

    /// Query-string decoding failed.
    #[error("failed to decode query string: {0}")]
    Query(#[source] serde_urlencoded::de::Error),

    /// The decoded value failed its validation rules.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl BindError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidContentType(_) | Self::UnexpectedContentType { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::EmptyBody
            | Self::Json(_)
            | Self::Form(_)
            | Self::Query(_)
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns a JSON value suitable for the `details` field of an envelope.
    ///
    /// Validation failures report per-field errors; everything else reports
    /// the error message.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::Validation(errors) => {
                serde_json::to_value(errors).unwrap_or_else(|_| Value::String(self.to_string()))
            }
            _ => Value::String(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BindError::InvalidContentType("x".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            BindError::PayloadTooLarge {
                limit: 1,
                actual: 2
            }
            .status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(BindError::EmptyBody.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_display() {
        let err = BindError::UnexpectedContentType {
            expected: "application/json",
            actual: "text/plain".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "expected Content-Type application/json, got text/plain"
        );
    }

    #[test]
    fn test_json_error_details_are_message() {
        let err: BindError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err.details(), Value::String(s) if s.starts_with("failed to decode JSON body")));
    }
}
