//! Response envelope and content types.
//!
//! Every handler and middleware returns an [`ApiResponse`]. When a handler
//! writes through one of the [`Context`](crate::Context) helpers the
//! envelope describes what was written; otherwise the dispatcher writes the
//! returned envelope itself as JSON.
//!
//! # Wire Format
//!
//! ```json
//! {"success": false, "message": "Invalid token", "code": 401}
//! ```
//!
//! `details` is present only when set.

use std::path::Path;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known content types written by the response helpers.
pub mod content_type {
    /// `application/json`
    pub const JSON: &str = "application/json";
    /// `text/plain`
    pub const TEXT: &str = "text/plain";
    /// `text/html`
    pub const HTML: &str = "text/html";
    /// `application/x-www-form-urlencoded`
    pub const FORM: &str = "application/x-www-form-urlencoded";
    /// `application/octet-stream`
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// The uniform success/message/code/details envelope.
///
/// # Example
///
/// ```
/// use merlin_core::ApiResponse;
/// use serde_json::json;
///
/// let resp = ApiResponse::error("Missing token", 401);
/// assert_eq!(
///     serde_json::to_value(&resp).unwrap(),
///     json!({"success": false, "message": "Missing token", "code": 401})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// HTTP status code the envelope stands for.
    pub code: u16,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiResponse {
    /// Creates an envelope without details.
    #[must_use]
    pub fn new(success: bool, message: impl Into<String>, code: u16) -> Self {
        Self {
            success,
            message: message.into(),
            details: None,
            code,
        }
    }

    /// Creates a successful 200 envelope.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(true, message, 200)
    }

    /// Creates a failed envelope with the given code.
    #[must_use]
    pub fn error(message: impl Into<String>, code: u16) -> Self {
        Self::new(false, message, code)
    }

    /// Attaches a details payload.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<Value>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns the status code, or 500 when `code` is not a valid status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        status_or_500(self.code)
    }

    /// Serializes the envelope to JSON bytes.
    #[must_use]
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // An envelope holds only strings, numbers and JSON values
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Converts a numeric code to a status, falling back to 500.
pub(crate) fn status_or_500(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Guesses a content type from a file extension.
///
/// Unknown or missing extensions give `application/octet-stream`.
///
/// # Example
///
/// ```
/// use merlin_core::detect_content_type;
/// use std::path::Path;
///
/// assert_eq!(detect_content_type(Path::new("index.html")), "text/html; charset=utf-8");
/// assert_eq!(detect_content_type(Path::new("blob")), "application/octet-stream");
/// ```
#[must_use]
pub fn detect_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",

        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",

        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",

        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        _ => content_type::OCTET_STREAM,
    }
}

/// Guesses a content type from the leading bytes of `data`.
///
/// Recognizes common image and archive signatures, HTML and XML markup and
/// plain UTF-8 text. Anything else is `application/octet-stream`.
///
/// ```rust
/// use merlin_core::sniff_content_type;
///
/// assert_eq!(sniff_content_type(b"  <!DOCTYPE html><p>hi"), "text/html; charset=utf-8");
/// assert_eq!(sniff_content_type(b"\x89PNG\r\n\x1a\n...."), "image/png");
/// ```
#[must_use]
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1F\x8B\x08", "application/gzip"),
        (b"\0asm", "application/wasm"),
    ];
    const HTML_TAGS: &[&[u8]] = &[
        b"<!doctype html",
        b"<html",
        b"<head",
        b"<body",
        b"<script",
        b"<title",
        b"<div",
        b"<p",
        b"<!--",
    ];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *mime;
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let text = &data[start..];
    let starts_with_tag = |tag: &[u8]| {
        text.len() > tag.len()
            && text[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(text[tag.len()], b' ' | b'>')
    };
    if HTML_TAGS.iter().any(|tag| starts_with_tag(tag)) {
        return "text/html; charset=utf-8";
    }
    if text.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    let binary = data
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B));
    if !binary && std::str::from_utf8(data).is_ok() {
        return "text/plain; charset=utf-8";
    }
    content_type::OCTET_STREAM
}
