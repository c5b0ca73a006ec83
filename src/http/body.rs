//! Body pre-processing handlers.
//!
//! Registered as the first handler of chains that consume a request body.
//! Each one parses the buffered body according to `Content-Type`, stores the
//! result on the `Request` and continues, or answers 400 and halts.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::http::multipart::{self, Multipart};
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::{BoxedHandler, Flow, Handler, HandlerResult};

/// Parses `application/json` bodies into `Request::json`.
///
/// Requests with another content type get an empty object, so downstream
/// handlers can always read `req.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBody;

#[async_trait]
impl Handler for JsonBody {
    async fn call(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        if !req.content_type().contains("application/json") {
            req.json = Some(serde_json::json!({}));
            return Ok(Flow::Next);
        }

        if req.body().is_empty() {
            req.json = Some(serde_json::json!({}));
            return Ok(Flow::Next);
        }

        match serde_json::from_slice::<serde_json::Value>(req.body()) {
            Ok(value) => {
                req.json = Some(value);
                Ok(Flow::Next)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting malformed JSON body");
                Ok(res.error(StatusCode::BAD_REQUEST, "Invalid JSON"))
            }
        }
    }
}

/// Decodes `multipart/form-data` bodies into `Request::file` or
/// `Request::fields`. Other content types pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultipartBody;

#[async_trait]
impl Handler for MultipartBody {
    async fn call(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        if !req.content_type().contains("multipart/form-data") {
            return Ok(Flow::Next);
        }

        let decoded = multipart::boundary_from_content_type(req.content_type())
            .and_then(|boundary| multipart::decode(req.body(), &boundary));

        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                return Ok(res.error(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to process file: {e}"),
                ));
            }
        };

        if !decoded.dropped.is_empty() {
            tracing::debug!(dropped = decoded.dropped.len(), "Multipart regions dropped");
            metrics::record_multipart_dropped(decoded.dropped.len());
        }

        match decoded.body {
            Multipart::File(file) => req.file = Some(file),
            Multipart::Fields(fields) => req.fields = fields,
        }
        Ok(Flow::Next)
    }
}

pub fn json_body() -> BoxedHandler {
    Arc::new(JsonBody)
}

pub fn multipart_body() -> BoxedHandler {
    Arc::new(MultipartBody)
}
