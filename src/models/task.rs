use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const MAX_LABEL_LENGTH: usize = 50;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum. Declaration order is the sort order.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Open
    }
}

/// A label attached to exactly one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskLabel {
    pub id: Uuid,
    pub name: String,
    pub task_id: Uuid,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// Identifier of the owning user. Never changes after creation.
    pub owner_id: Uuid,
    /// Loaded separately from `task_labels`.
    #[sqlx(skip)]
    pub labels: Vec<TaskLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|label| label.name.as_str()).collect()
    }
}

/// A label as submitted by the client: `{"name": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelInput {
    pub name: String,
}

/// Request body for `POST /tasks`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(min = 1))]
    pub description: String,

    /// Defaults to `OPEN` when omitted.
    pub status: Option<TaskStatus>,

    #[validate(custom = "validate_labels")]
    pub labels: Option<Vec<LabelInput>>,
}

/// Request body for `PATCH /tasks/{id}`. Every field is optional; a present
/// `labels` array replaces the task's whole label set.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    #[validate(custom = "validate_labels")]
    pub labels: Option<Vec<LabelInput>>,
}

/// A validated task ready to be persisted for an owner.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub labels: Vec<String>,
}

/// A validated partial update.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub labels: Option<Vec<String>>,
}

impl From<CreateTaskInput> for NewTask {
    fn from(input: CreateTaskInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            labels: input.labels.map(label_names).unwrap_or_default(),
        }
    }
}

impl From<UpdateTaskInput> for TaskChanges {
    fn from(input: UpdateTaskInput) -> Self {
        Self {
            title: input.title,
            description: input.description,
            status: input.status,
            labels: input.labels.map(label_names),
        }
    }
}

/// Trims label names and drops repeats, keeping first-seen order.
fn label_names(labels: Vec<LabelInput>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let name = label.name.trim().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn validate_labels(labels: &[LabelInput]) -> Result<(), ValidationError> {
    for label in labels {
        let name = label.name.trim();
        if name.is_empty() || name.chars().count() > MAX_LABEL_LENGTH {
            let mut error = ValidationError::new("label_name");
            error.message = Some(Cow::from(format!(
                "Label names must be between 1 and {} characters",
                MAX_LABEL_LENGTH
            )));
            return Err(error);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str) -> LabelInput {
        LabelInput {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_task_validation() {
        let valid_input = CreateTaskInput {
            title: "Valid Task".to_string(),
            description: "Valid Description".to_string(),
            status: None,
            labels: Some(vec![label("work")]),
        };
        assert!(valid_input.validate().is_ok());

        let empty_title = CreateTaskInput {
            title: "".to_string(),
            ..valid_input
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn test_title_is_limited_to_100_characters() {
        let input = CreateTaskInput {
            title: "a".repeat(101),
            description: "d".to_string(),
            status: Some(TaskStatus::Done),
            labels: None,
        };
        assert!(input.validate().is_err());

        let input = CreateTaskInput {
            title: "a".repeat(100),
            ..input
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_blank_label_is_rejected() {
        let input = UpdateTaskInput {
            labels: Some(vec![label("ok"), label("   ")]),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdateTaskInput {
            labels: Some(vec![label(&"x".repeat(MAX_LABEL_LENGTH + 1))]),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_new_task_defaults_and_dedupes_labels() {
        let input = CreateTaskInput {
            title: "Title".to_string(),
            description: "Desc".to_string(),
            status: None,
            labels: Some(vec![label("home"), label(" home "), label("urgent")]),
        };
        let task = NewTask::from(input);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.labels, vec!["home", "urgent"]);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "IN_PROGRESS"
        );
        let status: TaskStatus = serde_json::from_str("\"DONE\"").unwrap();
        assert_eq!(status, TaskStatus::Done);
        assert!(serde_json::from_str::<TaskStatus>("\"done\"").is_err());
    }

    #[test]
    fn test_status_ordering_follows_workflow() {
        assert!(TaskStatus::Open < TaskStatus::InProgress);
        assert!(TaskStatus::InProgress < TaskStatus::Done);
    }
}
