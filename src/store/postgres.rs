use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Role, Task, TaskChanges, TaskLabel, User};
use crate::query::{Page, TaskQuery};

const TASK_COLUMNS: &str =
    "t.id, t.title, t.description, t.status, t.owner_id, t.created_at, t.updated_at";

/// `users` row as stored; roles are a `text[]` column.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles = row
            .roles
            .iter()
            .map(|role| role.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::DatabaseError(format!("Corrupt role on user {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            roles,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Loads the labels of `tasks` in one round trip and attaches them.
async fn attach_labels<'e, E>(executor: E, tasks: &mut [Task]) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    if tasks.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = tasks.iter().map(|task| task.id).collect();
    let labels = sqlx::query_as::<_, TaskLabel>(
        "SELECT id, name, task_id FROM task_labels WHERE task_id = ANY($1) ORDER BY seq",
    )
    .bind(ids)
    .fetch_all(executor)
    .await?;

    let mut by_task: HashMap<Uuid, Vec<TaskLabel>> = HashMap::new();
    for label in labels {
        by_task.entry(label.task_id).or_default().push(label);
    }
    for task in tasks.iter_mut() {
        task.labels = by_task.remove(&task.id).unwrap_or_default();
    }
    Ok(())
}

/// Escapes `LIKE` metacharacters so the search term matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends the `WHERE` clause shared by the count and the page query.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, owner: Uuid, query: &TaskQuery) {
    builder.push(" WHERE t.owner_id = ").push_bind(owner);

    if let Some(status) = query.status {
        builder.push(" AND t.status = ").push_bind(status);
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(labels) = &query.labels {
        builder
            .push(" AND EXISTS (SELECT 1 FROM task_labels l WHERE l.task_id = t.id AND l.name = ANY(")
            .push_bind(labels.clone())
            .push("))");
    }
}

async fn insert_labels(
    conn: &mut sqlx::PgConnection,
    task_id: Uuid,
    names: &[String],
) -> Result<(), AppError> {
    for name in names {
        sqlx::query("INSERT INTO task_labels (id, name, task_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(task_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, password_hash, roles, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, password_hash, roles, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let roles: Vec<String> = user
            .normalized_roles()
            .iter()
            .map(|role| role.as_str().to_string())
            .collect();

        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, name, password_hash, roles) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, email, name, password_hash, roles, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&roles)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Email already exists".into()),
            other => other,
        })?;

        row.try_into()
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Page<Task>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        push_filters(&mut count, owner, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks t", TASK_COLUMNS));
        push_filters(&mut select, owner, query);
        // Column and direction come from closed enums, never from client text.
        select.push(format!(
            " ORDER BY t.{} {}, t.seq ASC",
            query.sort_by.column(),
            query.sort_order.as_sql()
        ));
        select
            .push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let mut items: Vec<Task> = select.build_query_as().fetch_all(&self.pool).await?;
        attach_labels(&self.pool, &mut items).await?;

        Ok(Page {
            items,
            meta: query.meta(total),
        })
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match task {
            Some(task) => {
                let mut tasks = [task];
                attach_labels(&self.pool, &mut tasks).await?;
                let [task] = tasks;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn insert_task(&self, owner: Uuid, task: NewTask) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks AS t (id, title, description, status, owner_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING t.id, t.title, t.description, t.status, t.owner_id, t.created_at, t.updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound("Owner not found".into())
            }
            other => other.into(),
        })?;

        insert_labels(&mut tx, created.id, &task.labels).await?;
        let mut tasks = [created];
        attach_labels(&mut *tx, &mut tasks).await?;
        tx.commit().await?;

        let [task] = tasks;
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut update = QueryBuilder::<Postgres>::new("UPDATE tasks AS t SET updated_at = now()");
        if let Some(title) = changes.title {
            update.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            update.push(", description = ").push_bind(description);
        }
        if let Some(status) = changes.status {
            update.push(", status = ").push_bind(status);
        }
        update
            .push(" WHERE t.id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", TASK_COLUMNS));

        let updated: Option<Task> = update.build_query_as().fetch_optional(&mut *tx).await?;
        let updated = updated.ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        if let Some(labels) = changes.labels {
            sqlx::query("DELETE FROM task_labels WHERE task_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_labels(&mut tx, id, &labels).await?;
        }

        let mut tasks = [updated];
        attach_labels(&mut *tx, &mut tasks).await?;
        tx.commit().await?;

        let [task] = tasks;
        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
