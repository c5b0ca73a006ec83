//! Task management API.
//!
//! # Data Flow
//! ```text
//! /tasks/...  → routes.rs (chain: body pre-processing → controller method)
//!             → controller.rs (validate, call repository, write response)
//!             → repository.rs (JSON file or memory)
//! CSV upload  → import.rs (header + rows → tasks and row errors)
//! ```

pub mod controller;
pub mod import;
pub mod model;
pub mod repository;
pub mod routes;

pub use controller::TaskController;
pub use model::{Task, TaskFilter, TaskUpdate};
pub use repository::{JsonFileRepository, MemoryRepository, RepositoryError, TaskRepository};
