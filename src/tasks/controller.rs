//! Task endpoint handlers.
//!
//! Each method is the last handler of a route chain. Body parsing has
//! already happened in `http::body`, so handlers read `req.json` or
//! `req.file` and write exactly one response.
//!
//! Validation and lookup failures are answered directly (400/404). Storage
//! failures propagate as `HandlerError` and become the router's 500.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

use crate::http::{Request, Response};
use crate::routing::{HandlerError, HandlerResult};
use crate::tasks::import::{self, RowError};
use crate::tasks::model::{Task, TaskFilter, TaskUpdate};
use crate::tasks::repository::{RepositoryError, TaskRepository};

pub const TASK_NOT_FOUND: &str = "Task not found";
pub const INVALID_DATA: &str = "Invalid data";

#[derive(Debug, Serialize)]
struct ImportSummary {
    success: bool,
    message: &'static str,
    imported: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<RowError>,
}

fn storage_failure(action: &'static str) -> impl Fn(RepositoryError) -> HandlerError {
    move |e| {
        tracing::error!(error = %e, action, "Task storage failed");
        HandlerError::new(format!("{action}: {e}"))
    }
}

fn id_param(req: &Request) -> String {
    req.param("id").unwrap_or_default().to_string()
}

pub struct TaskController {
    repository: Arc<dyn TaskRepository>,
}

impl TaskController {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    /// `GET /tasks`, filtered by `title`, `description` and `completed`.
    pub async fn list(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let filter = TaskFilter::from_query(&req.query);
        let tasks = self
            .repository
            .search(&filter)
            .await
            .map_err(storage_failure("Failed to list tasks"))?;

        Ok(res.json(
            StatusCode::OK,
            &json!({ "success": true, "count": tasks.len(), "data": tasks }),
        ))
    }

    /// `GET /tasks/:id`
    pub async fn get(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let id = id_param(req);
        let task = self
            .repository
            .get(&id)
            .await
            .map_err(storage_failure("Failed to load task"))?;

        match task {
            Some(task) => Ok(res.json(StatusCode::OK, &json!({ "success": true, "data": task }))),
            None => Ok(res.error(StatusCode::NOT_FOUND, TASK_NOT_FOUND)),
        }
    }

    /// `POST /tasks`
    pub async fn create(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let body = req.json.take().unwrap_or_else(|| json!({}));
        let task = match Task::from_json(&body) {
            Ok(task) => task,
            Err(errors) => return Ok(invalid(res, errors)),
        };

        let task = self
            .repository
            .create(task)
            .await
            .map_err(storage_failure("Failed to create task"))?;

        tracing::info!(task_id = %task.id, "Task created");
        Ok(res.json(
            StatusCode::CREATED,
            &json!({ "success": true, "message": "Task created", "data": task }),
        ))
    }

    /// `PUT /tasks/:id`
    pub async fn update(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let id = id_param(req);
        let body = req.json.take().unwrap_or_else(|| json!({}));
        let update = match TaskUpdate::from_json(&body) {
            Ok(update) => update,
            Err(errors) => return Ok(invalid(res, errors)),
        };

        let task = self
            .repository
            .update(&id, update)
            .await
            .map_err(storage_failure("Failed to update task"))?;

        match task {
            Some(task) => Ok(res.json(
                StatusCode::OK,
                &json!({ "success": true, "message": "Task updated", "data": task }),
            )),
            None => Ok(res.error(StatusCode::NOT_FOUND, TASK_NOT_FOUND)),
        }
    }

    /// `DELETE /tasks/:id`
    pub async fn delete(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let id = id_param(req);
        let removed = self
            .repository
            .delete(&id)
            .await
            .map_err(storage_failure("Failed to delete task"))?;

        if !removed {
            return Ok(res.error(StatusCode::NOT_FOUND, TASK_NOT_FOUND));
        }
        tracing::info!(task_id = %id, "Task deleted");
        Ok(res.json(
            StatusCode::OK,
            &json!({ "success": true, "message": "Task deleted" }),
        ))
    }

    /// `PATCH /tasks/:id/complete` toggles completion.
    pub async fn complete(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let id = id_param(req);
        let task = self
            .repository
            .toggle_complete(&id)
            .await
            .map_err(storage_failure("Failed to update task"))?;

        let Some(task) = task else {
            return Ok(res.error(StatusCode::NOT_FOUND, TASK_NOT_FOUND));
        };
        let message = if task.is_completed() {
            "Task marked as completed"
        } else {
            "Task marked as pending"
        };
        Ok(res.json(
            StatusCode::OK,
            &json!({ "success": true, "message": message, "data": task }),
        ))
    }

    /// `POST /tasks/import/csv` with a multipart `.csv` upload.
    pub async fn import_csv(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let Some(file) = req.file.take() else {
            return Ok(res.error(StatusCode::BAD_REQUEST, "No CSV file uploaded"));
        };
        if !file.filename.to_ascii_lowercase().ends_with(".csv") {
            return Ok(res.error(StatusCode::BAD_REQUEST, "Only CSV files are allowed"));
        }

        let batch = match import::parse_tasks(&file.data) {
            Ok(batch) => batch,
            Err(e) => {
                return Ok(res.error(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to process file: {e}"),
                ))
            }
        };

        let imported = if batch.tasks.is_empty() {
            0
        } else {
            self.repository
                .create_many(batch.tasks)
                .await
                .map_err(storage_failure("Failed to import tasks"))?
        };

        tracing::info!(
            filename = %file.filename,
            imported,
            rejected = batch.errors.len(),
            "CSV import completed"
        );
        Ok(res.json(
            StatusCode::OK,
            &ImportSummary {
                success: true,
                message: "Import completed",
                imported,
                errors: batch.errors,
            },
        ))
    }
}

fn invalid(res: &mut Response, errors: Vec<String>) -> crate::routing::Flow {
    res.json(
        StatusCode::BAD_REQUEST,
        &json!({ "success": false, "message": INVALID_DATA, "errors": errors }),
    )
}

/// `GET /` payload describing the available endpoints.
pub fn api_index() -> Value {
    json!({
        "success": true,
        "message": "Task API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "list": "GET /tasks",
            "get": "GET /tasks/:id",
            "create": "POST /tasks",
            "update": "PUT /tasks/:id",
            "delete": "DELETE /tasks/:id",
            "complete": "PATCH /tasks/:id/complete",
            "import": "POST /tasks/import/csv",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::multipart::FilePart;
    use crate::tasks::repository::MemoryRepository;
    use axum::http::Method;

    fn controller() -> (Arc<MemoryRepository>, TaskController) {
        let repository = Arc::new(MemoryRepository::new());
        (repository.clone(), TaskController::new(repository))
    }

    fn body(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    fn with_id(method: Method, id: &str) -> Request {
        let mut req = Request::new(method, format!("/{id}"));
        req.params.insert("id".to_string(), id.to_string());
        req
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (_, ctl) = controller();
        let mut req = Request::new(Method::POST, "/");
        req.json = Some(json!({ "title": "a", "description": "b" }));
        let mut res = Response::new();
        ctl.create(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let id = body(&res)["data"]["id"].as_str().unwrap().to_string();

        let mut req = with_id(Method::GET, &id);
        let mut res = Response::new();
        ctl.get(&mut req, &mut res).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res)["data"]["title"], "a");
    }

    #[tokio::test]
    async fn test_create_invalid_is_400() {
        let (_, ctl) = controller();
        let mut req = Request::new(Method::POST, "/");
        req.json = Some(json!({ "title": "a" }));
        let mut res = Response::new();
        ctl.create(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let payload = body(&res);
        assert_eq!(payload["message"], INVALID_DATA);
        assert_eq!(payload["errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_task_is_404() {
        let (_, ctl) = controller();
        for method in [Method::GET, Method::DELETE, Method::PATCH] {
            let mut req = with_id(method.clone(), "nope");
            let mut res = Response::new();
            match method {
                Method::GET => ctl.get(&mut req, &mut res).await.unwrap(),
                Method::DELETE => ctl.delete(&mut req, &mut res).await.unwrap(),
                _ => ctl.complete(&mut req, &mut res).await.unwrap(),
            };
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
            assert_eq!(body(&res)["message"], TASK_NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_list_filters_completed() {
        let (repository, ctl) = controller();
        let task = repository.create(Task::new("a", "b")).await.unwrap();
        repository.create(Task::new("c", "d")).await.unwrap();
        repository.toggle_complete(&task.id).await.unwrap();

        let mut req = Request::new(Method::GET, "/?completed=true");
        req.query.insert("completed".to_string(), "true".to_string());
        let mut res = Response::new();
        ctl.list(&mut req, &mut res).await.unwrap();

        let payload = body(&res);
        assert_eq!(payload["count"], 1);
        assert_eq!(payload["data"][0]["id"], task.id.as_str());
    }

    #[tokio::test]
    async fn test_import_rejects_non_csv() {
        let (_, ctl) = controller();
        let mut req = Request::new(Method::POST, "/import/csv");
        req.file = Some(FilePart {
            field_name: "file".into(),
            filename: "tasks.txt".into(),
            content_type: "text/plain".into(),
            data: b"title,description\n".to_vec(),
        });
        let mut res = Response::new();
        ctl.import_csv(&mut req, &mut res).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_import_reports_row_errors() {
        let (repository, ctl) = controller();
        let mut req = Request::new(Method::POST, "/import/csv");
        req.file = Some(FilePart {
            field_name: "file".into(),
            filename: "tasks.csv".into(),
            content_type: "text/csv".into(),
            data: b"title,description\na,b\n,c\n".to_vec(),
        });
        let mut res = Response::new();
        ctl.import_csv(&mut req, &mut res).await.unwrap();

        let payload = body(&res);
        assert_eq!(payload["message"], "Import completed");
        assert_eq!(payload["imported"], 1);
        assert_eq!(payload["errors"][0]["row"], 3);
        assert_eq!(repository.all().await.unwrap().len(), 1);
    }
}
