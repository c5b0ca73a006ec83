//! Task domain object and field validation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const TITLE_REQUIRED: &str = "Title is required and must be a string";
pub const DESCRIPTION_REQUIRED: &str = "Description is required and must be a string";

/// A stored task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Set while the task is completed.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// New pending task with a random UUID.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Validate creation input. Returns one message per invalid field.
    pub fn validate(title: Option<&str>, description: Option<&str>) -> Vec<String> {
        let mut errors = Vec::new();
        if !is_present(title) {
            errors.push(TITLE_REQUIRED.to_string());
        }
        if !is_present(description) {
            errors.push(DESCRIPTION_REQUIRED.to_string());
        }
        errors
    }

    /// Validate a JSON body and build the task from it.
    pub fn from_json(body: &Value) -> Result<Self, Vec<String>> {
        let title = body.get("title").and_then(Value::as_str);
        let description = body.get("description").and_then(Value::as_str);

        let errors = Self::validate(title, description);
        match (title, description) {
            (Some(title), Some(description)) if errors.is_empty() => {
                Ok(Self::new(title, description))
            }
            _ => Err(errors),
        }
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Partial update of a task's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TaskUpdate {
    /// Fields absent from the body are left unchanged; fields present must be
    /// non-blank strings.
    pub fn from_json(body: &Value) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        let title = optional_field(body, "title", TITLE_REQUIRED, &mut errors);
        let description = optional_field(body, "description", DESCRIPTION_REQUIRED, &mut errors);

        if errors.is_empty() {
            Ok(Self { title, description })
        } else {
            Err(errors)
        }
    }

    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        task.updated_at = Utc::now();
    }
}

fn optional_field(
    body: &Value,
    key: &str,
    message: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match body.get(key) {
        None => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(_) => {
            errors.push(message.to_string());
            None
        }
    }
}

/// Search criteria taken from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Case-insensitive substring of the description.
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    /// `completed=true` selects completed tasks; any other value selects
    /// pending ones.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let non_empty = |key: &str| query.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            title: non_empty("title"),
            description: non_empty("description"),
            completed: query.get("completed").map(|v| v == "true"),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };

        contains(&task.title, &self.title)
            && contains(&task.description, &self.description)
            && self
                .completed
                .is_none_or(|completed| task.is_completed() == completed)
    }
}
