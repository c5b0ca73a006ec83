//! Task persistence.
//!
//! # Responsibilities
//! - Define the `TaskRepository` seam used by the controller
//! - Persist tasks as a pretty-printed JSON array on disk
//! - Provide an in-memory store for tests and ephemeral runs
//!
//! # Design Decisions
//! - Read-modify-write cycles are serialized by one async mutex per store
//! - A missing or unreadable data file reads as an empty list

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::tasks::model::{Task, TaskFilter, TaskUpdate};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    async fn all(&self) -> Result<Vec<Task>, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<Task>, RepositoryError>;

    async fn create(&self, task: Task) -> Result<Task, RepositoryError>;

    /// Append every task in one write. Returns how many were stored.
    async fn create_many(&self, tasks: Vec<Task>) -> Result<usize, RepositoryError>;

    /// `None` when no task has this id.
    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, RepositoryError>;

    /// `false` when no task has this id.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    async fn search(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError>;

    /// Flip between completed and pending.
    async fn toggle_complete(&self, id: &str) -> Result<Option<Task>, RepositoryError>;
}

fn apply_update(tasks: &mut [Task], id: &str, update: TaskUpdate) -> Option<Task> {
    let task = tasks.iter_mut().find(|t| t.id == id)?;
    update.apply(task);
    Some(task.clone())
}

fn toggle(tasks: &mut [Task], id: &str) -> Option<Task> {
    let task = tasks.iter_mut().find(|t| t.id == id)?;
    let now = Utc::now();
    task.completed_at = match task.completed_at {
        Some(_) => None,
        None => Some(now),
    };
    task.updated_at = now;
    Some(task.clone())
}

fn remove(tasks: &mut Vec<Task>, id: &str) -> bool {
    let before = tasks.len();
    tasks.retain(|t| t.id != id);
    tasks.len() != before
}

/// Tasks stored in a JSON file.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Open the store, creating the parent directory and an empty file when
    /// they do not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let repository = Self::new(path);
        if let Some(parent) = repository.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        if tokio::fs::metadata(&repository.path).await.is_err() {
            tokio::fs::write(&repository.path, "[]").await?;
            tracing::info!(path = %repository.path.display(), "Created empty task file");
        }
        Ok(repository)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Vec<Task> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to read task file");
                }
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Task file is not a valid task list; treating as empty"
                );
                Vec::new()
            }
        }
    }

    async fn write(&self, tasks: &[Task]) -> Result<(), RepositoryError> {
        let encoded = serde_json::to_string_pretty(tasks)?;
        tokio::fs::write(&self.path, encoded).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for JsonFileRepository {
    async fn all(&self) -> Result<Vec<Task>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await)
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await.into_iter().find(|t| t.id == id))
    }

    async fn create(&self, task: Task) -> Result<Task, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read().await;
        tasks.push(task.clone());
        self.write(&tasks).await?;
        Ok(task)
    }

    async fn create_many(&self, new: Vec<Task>) -> Result<usize, RepositoryError> {
        let _guard = self.lock.lock().await;
        let count = new.len();
        let mut tasks = self.read().await;
        tasks.extend(new);
        self.write(&tasks).await?;
        Ok(count)
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read().await;
        let updated = apply_update(&mut tasks, id, update);
        if updated.is_some() {
            self.write(&tasks).await?;
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read().await;
        let removed = remove(&mut tasks, id);
        if removed {
            self.write(&tasks).await?;
        }
        Ok(removed)
    }

    async fn search(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read().await;
        tasks.retain(|t| filter.matches(t));
        Ok(tasks)
    }

    async fn toggle_complete(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read().await;
        let toggled = toggle(&mut tasks, id);
        if toggled.is_some() {
            self.write(&tasks).await?;
        }
        Ok(toggled)
    }
}

/// Tasks held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn all(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.tasks.lock().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.lock().await.iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, task: Task) -> Result<Task, RepositoryError> {
        self.tasks.lock().await.push(task.clone());
        Ok(task)
    }

    async fn create_many(&self, new: Vec<Task>) -> Result<usize, RepositoryError> {
        let count = new.len();
        self.tasks.lock().await.extend(new);
        Ok(count)
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, RepositoryError> {
        Ok(apply_update(&mut *self.tasks.lock().await, id, update))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(remove(&mut *self.tasks.lock().await, id))
    }

    async fn search(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        Ok(self
            .tasks
            .lock()
            .await
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn toggle_complete(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        Ok(toggle(&mut *self.tasks.lock().await, id))
    }
}
