//! Persistence seams.
//!
//! Services only see the [`UserStore`] and [`TaskStore`] traits. [`PgStore`] is the
//! production implementation; [`MemoryStore`] keeps everything in process and backs the
//! test suite and database-less local runs. Both enforce the same rules: unique emails,
//! owner-scoped listings, and cascading deletes (user → tasks → labels).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskChanges, User};
use crate::query::{Page, TaskQuery};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Removes the user together with all of their tasks and labels.
    /// Returns `false` when no such user existed.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Lists `owner`'s tasks matching `query`. The owner filter is always applied.
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Page<Task>, AppError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn insert_task(&self, owner: Uuid, task: NewTask) -> Result<Task, AppError>;

    /// Applies `changes` to an existing task. A present label list replaces the old one.
    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Task, AppError>;

    /// Removes the task and its labels. Returns `false` when no such task existed.
    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError>;
}
