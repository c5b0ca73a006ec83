//! Application assembly: shared context and the full route table.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::ServerConfig;
use crate::routing::{handler_fn, RouteError, Router};
use crate::tasks::{controller, routes, JsonFileRepository, RepositoryError, TaskController, TaskRepository};

/// State shared by every request.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub repository: Arc<dyn TaskRepository>,
}

impl AppContext {
    pub fn new(config: ServerConfig, repository: Arc<dyn TaskRepository>) -> Self {
        Self {
            config: Arc::new(config),
            repository,
        }
    }

    /// Context backed by the configured JSON data file.
    pub async fn from_config(config: ServerConfig) -> Result<Self, RepositoryError> {
        let repository = JsonFileRepository::open(&config.storage.data_file).await?;
        tracing::info!(path = %repository.path().display(), "Task storage ready");
        Ok(Self::new(config, Arc::new(repository)))
    }
}

/// `GET /` index plus the task routes mounted at `/tasks`.
pub fn build_router(ctx: &AppContext) -> Result<Router, RouteError> {
    let controller = Arc::new(TaskController::new(ctx.repository.clone()));

    let mut router = Router::new();
    router.get(
        "/",
        [handler_fn(|_req, res| {
            Box::pin(async move { Ok(res.json(StatusCode::OK, &controller::api_index())) })
        })],
    )?;
    router.nest("/tasks", routes::router(controller)?)?;

    Ok(router)
}
