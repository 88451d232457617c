use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskChanges, TaskLabel, User};
use crate::query::{Page, TaskQuery};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    /// Kept in insertion order; listings rely on it for tie-breaking.
    tasks: Vec<Task>,
}

/// In-process store with the same semantics as [`super::PgStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of labels across all tasks.
    pub async fn label_count(&self) -> usize {
        let state = self.state.read().await;
        state.tasks.iter().map(|task| task.labels.len()).sum()
    }
}

fn build_labels(task_id: Uuid, names: Vec<String>) -> Vec<TaskLabel> {
    names
        .into_iter()
        .map(|name| TaskLabel {
            id: Uuid::new_v4(),
            name,
            task_id,
        })
        .collect()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|existing| existing.email == user.email) {
            return Err(AppError::Conflict("Email already exists".into()));
        }

        let roles = user.normalized_roles();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            roles,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let before = state.users.len();
        state.users.retain(|user| user.id != id);
        if state.users.len() == before {
            return Ok(false);
        }
        // Labels live inside their task, so dropping the tasks drops them too.
        state.tasks.retain(|task| task.owner_id != id);
        Ok(true)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Page<Task>, AppError> {
        let state = self.state.read().await;
        Ok(query.apply(owner, &state.tasks))
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let state = self.state.read().await;
        Ok(state.tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn insert_task(&self, owner: Uuid, task: NewTask) -> Result<Task, AppError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|user| user.id == owner) {
            return Err(AppError::NotFound("Owner not found".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let task = Task {
            id,
            title: task.title,
            description: task.description,
            status: task.status,
            owner_id: owner,
            labels: build_labels(id, task.labels),
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Task, AppError> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(labels) = changes.labels {
            task.labels = build_labels(id, labels);
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        Ok(state.tasks.len() != before)
    }
}
