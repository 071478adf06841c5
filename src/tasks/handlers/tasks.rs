use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::tasks::types::{
    AssignUserRequest, CreateTaskRequest, TaskDetail, TaskFilter, TaskListItem, UpdateTaskRequest,
};

pub async fn handle_task_list(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<TaskListItem>>, AppError> {
    let tasks = state.lifecycle.list_tasks(filter).await?;
    let totals = state
        .aggregation
        .totals_for(tasks.iter().map(|task| task.id).collect())
        .await?;

    Ok(Json(
        tasks
            .into_iter()
            .map(|task| TaskListItem {
                total_logged_minutes: totals.get(&task.id).copied().unwrap_or(0),
                id: task.id,
                title: task.title,
            })
            .collect(),
    ))
}

pub async fn handle_task_create(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskDetail>), AppError> {
    let task = state.lifecycle.create_task(user.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(TaskDetail::new(task, Vec::new()))))
}

pub async fn handle_task_get(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskDetail>, AppError> {
    let (task, comments) = state.lifecycle.get_task(id).await?;
    let total = state.aggregation.total_logged_minutes(id).await?;
    let detail = TaskDetail::new(task, comments);
    Ok(Json(detail.with_total_logged_minutes(total)))
}

pub async fn handle_task_update(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskDetail>, AppError> {
    let task = state.lifecycle.update_task(id, payload).await?;
    let (task, comments) = state.lifecycle.get_task(task.id).await?;
    Ok(Json(TaskDetail::new(task, comments)))
}

pub async fn handle_task_delete(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.lifecycle.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_task_complete(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskDetail>, AppError> {
    state.lifecycle.complete_task(id).await?;
    let (task, comments) = state.lifecycle.get_task(id).await?;
    Ok(Json(TaskDetail::new(task, comments)))
}

pub async fn handle_task_assign_user(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignUserRequest>,
) -> Result<Json<TaskDetail>, AppError> {
    state.lifecycle.assign_user(id, payload.assignee).await?;
    let (task, comments) = state.lifecycle.get_task(id).await?;
    Ok(Json(TaskDetail::new(task, comments)))
}

/// Already-serialized JSON, straight from the cache when warm.
pub async fn handle_top_logged_tasks_last_month(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let body = state
        .aggregation
        .top_logged_tasks_last_month(user.user_id, Utc::now())
        .await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
