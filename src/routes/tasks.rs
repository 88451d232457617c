use crate::{
    auth::{assert_owner, CurrentUser, Identity},
    error::AppError,
    models::{CreateTaskInput, NewTask, Task, TaskChanges, UpdateTaskInput},
    query::{TaskQuery, TaskQueryParams},
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Fetches a task and checks that `identity` owns it: 404 first, then 403.
async fn owned_task(state: &AppState, identity: &Identity, id: Uuid) -> Result<Task, AppError> {
    let task = state
        .tasks
        .find_task(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    assert_owner(identity, &task)?;
    Ok(task)
}

/// Lists the caller's tasks.
///
/// ## Query Parameters:
/// - `status` (optional): `OPEN`, `IN_PROGRESS` or `DONE`.
/// - `search` (optional, at least 3 characters): case-insensitive match on title or description.
/// - `labels` (optional): comma separated; a task matches if it has any of them.
/// - `sortBy` (optional): `createdAt` (default), `title` or `status`.
/// - `sortOrder` (optional): `ASC` or `DESC` (default).
/// - `limit` (optional, 1..=10000, default 10) and `offset` (optional, default 0).
///
/// ## Responses:
/// - `200 OK`: `{items: [Task], meta: {total, limit, offset}}`.
/// - `400 Bad Request`: a parameter is malformed or out of range.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    params: web::Query<TaskQueryParams>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let query = TaskQuery::try_from(params.into_inner())?;
    let page = state.tasks.list_tasks(current.0.sub, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Creates a task owned by the caller. `status` defaults to `OPEN`.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<CreateTaskInput>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = state
        .tasks
        .insert_task(current.0.sub, NewTask::from(task_data.into_inner()))
        .await?;
    log::info!("User {} created task {}", current.0.sub, task.id);

    Ok(HttpResponse::Created().json(task))
}

#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = owned_task(&state, &current.0, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Applies any subset of `{title, description, status, labels}`. Labels, when present,
/// replace the task's current set.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<UpdateTaskInput>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task = owned_task(&state, &current.0, task_id.into_inner()).await?;

    let updated = state
        .tasks
        .update_task(task.id, TaskChanges::from(task_data.into_inner()))
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = owned_task(&state, &current.0, task_id.into_inner()).await?;

    if !state.tasks.delete_task(task.id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }
    log::info!("User {} deleted task {}", current.0.sub, task.id);

    Ok(HttpResponse::NoContent().finish())
}
