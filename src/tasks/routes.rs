//! Route table for `/tasks`.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::http::body::{json_body, multipart_body};
use crate::http::{Request, Response};
use crate::routing::{BoxedHandler, Handler, HandlerResult, RouteError, Router};
use crate::tasks::controller::TaskController;

/// Adapts one controller method into a chain handler.
struct Bound<F> {
    controller: Arc<TaskController>,
    method: F,
}

#[async_trait]
impl<F> Handler for Bound<F>
where
    F: for<'a> Fn(&'a TaskController, &'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    async fn call(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        (self.method)(self.controller.as_ref(), req, res).await
    }
}

fn bind<F>(controller: &Arc<TaskController>, method: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a TaskController, &'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(Bound {
        controller: controller.clone(),
        method,
    })
}

/// Build the task routes, relative to their mount point.
pub fn router(controller: Arc<TaskController>) -> Result<Router, RouteError> {
    let c = &controller;
    let mut router = Router::new();

    router
        .get("/", [bind(c, |c, req, res| Box::pin(c.list(req, res)))])?
        .get("/:id", [bind(c, |c, req, res| Box::pin(c.get(req, res)))])?
        .post(
            "/",
            [json_body(), bind(c, |c, req, res| Box::pin(c.create(req, res)))],
        )?
        .post(
            "/import/csv",
            [
                multipart_body(),
                bind(c, |c, req, res| Box::pin(c.import_csv(req, res))),
            ],
        )?
        .put(
            "/:id",
            [json_body(), bind(c, |c, req, res| Box::pin(c.update(req, res)))],
        )?
        .patch(
            "/:id/complete",
            [bind(c, |c, req, res| Box::pin(c.complete(req, res)))],
        )?
        .delete("/:id", [bind(c, |c, req, res| Box::pin(c.delete(req, res)))])?;

    Ok(router)
}
