//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     (method, "/tasks/:id", [handlers])
//!     → template.rs (compile to anchored matcher + param names)
//!     → router.rs (append to the method's ordered table)
//!
//! Incoming request (method, target):
//!     → http::target (path + query)
//!     → router.rs (first matching route for the method)
//!     → chain.rs (run handlers in order until one halts or fails)
//!     → Response (written by a handler, or 404/500 from the router)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - First match wins, in registration order
//! - Handler outcomes are an explicit `Flow`, never inferred

use thiserror::Error;

pub mod chain;
pub mod router;
pub mod template;

pub use chain::{handler_fn, BoxedHandler, Flow, Handler, HandlerError, HandlerResult};
pub use router::{Method, Route, RouteMatch, Router, NOT_FOUND_MESSAGE};
pub use template::PathTemplate;

/// Errors raised while building the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("path template must start with '/': {0:?}")]
    InvalidTemplate(String),

    #[error("empty parameter name in template {0:?}")]
    EmptyParamName(String),

    #[error("parameter {name:?} appears twice in template {template:?}")]
    DuplicateParam { template: String, name: String },

    #[error("route {method} {template} has no handlers")]
    EmptyChain { method: Method, template: String },

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid route pattern: {0}")]
    Pattern(#[from] regex::Error),
}
