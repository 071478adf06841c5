use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::tasks::types::{
    LogDateRequest, LogDateResponse, StartTimerRequest, StartTimerResponse, StopTimerRequest,
    StopTimerResponse, TaskRefQuery, TimeLog,
};

pub async fn handle_time_log_list(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<TaskRefQuery>,
) -> Result<Json<Vec<TimeLog>>, AppError> {
    Ok(Json(state.time_tracker.list(query.task).await?))
}

pub async fn handle_time_log_delete(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.time_tracker.delete(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_start_timer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<StartTimerRequest>,
) -> Result<(StatusCode, Json<StartTimerResponse>), AppError> {
    let log = state
        .time_tracker
        .start_timer(user.user_id, payload.task, payload.start_time)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(StartTimerResponse {
            id: log.id,
            task: log.task_id,
            start_time: payload.start_time,
        }),
    ))
}

pub async fn handle_stop_timer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<StopTimerRequest>,
) -> Result<Json<StopTimerResponse>, AppError> {
    let log = state
        .time_tracker
        .stop_timer(user.user_id, payload.task, payload.end_time)
        .await?;
    Ok(Json(StopTimerResponse {
        id: log.id,
        task: log.task_id,
        duration_minutes: log.duration_minutes,
    }))
}

pub async fn handle_log_date(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<LogDateRequest>,
) -> Result<(StatusCode, Json<LogDateResponse>), AppError> {
    let log = state
        .time_tracker
        .log_date(
            user.user_id,
            payload.task,
            payload.date,
            payload.duration_minutes,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(LogDateResponse {
            id: log.id,
            task: log.task_id,
            date: payload.date,
            duration_minutes: payload.duration_minutes,
        }),
    ))
}
