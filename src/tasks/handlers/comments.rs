use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::tasks::types::{CommentResponse, CreateCommentRequest, TaskRefQuery};

pub async fn handle_comment_list(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<TaskRefQuery>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let comments = state.lifecycle.list_comments(query.task).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

pub async fn handle_comment_create(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let comment = state.lifecycle.create_comment(user.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}
