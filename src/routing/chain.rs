//! Handler chains.
//!
//! # Responsibilities
//! - Define the single handler shape used by every route
//! - Run a matched route's handlers strictly in order
//!
//! # Design Decisions
//! - Every handler returns `Result<Flow, HandlerError>`:
//!   `Flow::Next` continues (after whatever the handler awaited),
//!   `Flow::Halt` means the handler wrote the response and the chain stops,
//!   `Err` aborts the chain
//! - Handlers never run concurrently; the driver awaits each one before
//!   looking at the next

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::http::{Request, Response};

/// What the chain driver does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next handler.
    Next,
    /// The response has been written; skip the rest of the chain.
    Halt,
}

/// A handler failure. The driver turns it into a 500 carrying `message`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type HandlerResult = Result<Flow, HandlerError>;

/// A step in a route's handler chain.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: &mut Request, res: &mut Response) -> HandlerResult;
}

pub type BoxedHandler = Arc<dyn Handler>;

/// Adapter turning a closure into a [`Handler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    async fn call(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        (self.0)(req, res).await
    }
}

/// Wrap a closure returning a boxed future as a chain handler.
///
/// ```rust,ignore
/// let ping = handler_fn(|_req, res| Box::pin(async move {
///     Ok(res.json(StatusCode::OK, &serde_json::json!({ "pong": true })))
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler(f))
}

/// How a chain finished when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Handler at `index` returned `Flow::Halt`.
    Halted { index: usize },
    /// Every handler returned `Flow::Next`.
    Exhausted,
}

/// Run `handlers` in order against one request.
pub async fn run(
    handlers: &[BoxedHandler],
    req: &mut Request,
    res: &mut Response,
) -> Result<Completion, HandlerError> {
    for (index, handler) in handlers.iter().enumerate() {
        match handler.call(req, res).await? {
            Flow::Next => {}
            Flow::Halt => return Ok(Completion::Halted { index }),
        }
    }
    Ok(Completion::Exhausted)
}
