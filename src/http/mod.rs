//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum listener, tower-http layers, body buffering)
//!     → request.rs (core Request: method, target, headers, body)
//!     → routing::Router::handle
//!         → target.rs (path + query)
//!         → body.rs (JSON / multipart pre-processing handlers)
//!             → multipart.rs (boundary framing)
//!     → response.rs (core Response → axum response)
//!     → Send to client
//! ```

pub mod body;
pub mod multipart;
pub mod request;
pub mod response;
pub mod server;
pub mod target;

pub use request::{Request, X_REQUEST_ID};
pub use response::{ErrorBody, Response, JSON_CONTENT_TYPE};
pub use server::HttpServer;
