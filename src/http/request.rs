//! Buffered request as seen by route handlers.
//!
//! # Responsibilities
//! - Carry method, raw target, headers and the fully buffered body
//! - Hold per-request state filled in along the chain: path parameters,
//!   query pairs, the parsed JSON body and the uploaded file
//!
//! # Design Decisions
//! - Body is buffered before routing (no streaming)
//! - Upstream handlers publish parsed data through typed fields rather than
//!   an untyped extension map

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::http::multipart::{FilePart, Part};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
    /// Path parameters bound by the router.
    pub params: HashMap<String, String>,
    /// Decoded query pairs.
    pub query: HashMap<String, String>,
    /// JSON body, set by the JSON body parser.
    pub json: Option<serde_json::Value>,
    /// First uploaded file, set by the multipart parser.
    pub file: Option<FilePart>,
    /// Plain multipart fields when no file part was sent.
    pub fields: Vec<Part>,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            query: HashMap::new(),
            json: None,
            file: None,
            fields: Vec::new(),
        }
    }

    pub fn from_parts(method: Method, target: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        let mut request = Self::new(method, target);
        request.headers = headers;
        request.body = body;
        request
    }

    /// Builder-style header insertion. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request target (path plus optional query).
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// `Content-Type` header, or an empty string.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_defaults_to_empty() {
        let req = Request::new(Method::POST, "/tasks");
        assert_eq!(req.content_type(), "");

        let req = req.with_header("Content-Type", "application/json");
        assert_eq!(req.content_type(), "application/json");
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let req = Request::new(Method::GET, "/").with_header("bad header", "x");
        assert!(req.headers().is_empty());
    }
}
