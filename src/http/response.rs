//! Response sink written by route handlers.
//!
//! # Responsibilities
//! - Collect status, headers and body written by the handler chain
//! - Serialize JSON payloads
//! - Convert into an axum response for the listener
//!
//! # Design Decisions
//! - One response per request: the first write wins, later writes are
//!   dropped with a warning
//! - Chain failures bypass that rule through `fail`, which always replaces
//!   the response with a 500

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

use crate::routing::Flow;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body of every router-generated error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            sent: false,
        }
    }

    /// Write the response. Returns `Flow::Halt` so handlers can
    /// `return Ok(res.send(..))`.
    pub fn send(&mut self, status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Flow {
        if self.sent {
            tracing::warn!(
                status = %self.status,
                attempted = %status,
                "Response already sent; dropping second write"
            );
            return Flow::Halt;
        }
        self.write(status, content_type, body.into());
        Flow::Halt
    }

    /// Serialize `payload` as JSON and write it.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, payload: &T) -> Flow {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.send(status, JSON_CONTENT_TYPE, bytes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                self.send(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    JSON_CONTENT_TYPE,
                    error_bytes("Internal server error"),
                )
            }
        }
    }

    /// Write a `{success: false, message}` body.
    pub fn error(&mut self, status: StatusCode, message: impl Into<String>) -> Flow {
        self.json(status, &ErrorBody::new(message))
    }

    /// Replace whatever was written with a 500 error.
    pub fn fail(&mut self, message: &str) {
        let message = if message.is_empty() {
            "Internal server error"
        } else {
            message
        };
        self.headers.clear();
        self.write(
            StatusCode::INTERNAL_SERVER_ERROR,
            JSON_CONTENT_TYPE,
            error_bytes(message).into(),
        );
    }

    pub fn set_header(&mut self, name: header::HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    fn write(&mut self, status: StatusCode, content_type: &str, body: Bytes) {
        self.status = status;
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
        self.body = body;
        self.sent = true;
    }

    pub fn into_http(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn error_bytes(message: &str) -> Vec<u8> {
    serde_json::to_vec(&ErrorBody::new(message)).unwrap_or_else(|_| b"{\"success\":false}".to_vec())
}
