use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use log::warn;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::tasks::types::{Attachment, PresignUploadRequest, PresignUploadResponse, TaskRefQuery};

pub async fn handle_presign_upload(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<PresignUploadRequest>,
) -> Result<(StatusCode, Json<PresignUploadResponse>), AppError> {
    let presigned = state.attachments.presign_upload(payload).await?;
    Ok((StatusCode::CREATED, Json(presigned)))
}

pub async fn handle_attachment_list(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<TaskRefQuery>,
) -> Result<Json<Vec<Attachment>>, AppError> {
    Ok(Json(state.attachments.list(query.task).await?))
}

/// Object-created notifications from the storage server. The shared token
/// is compared verbatim against the `Authorization` header before the body
/// is parsed.
pub async fn handle_storage_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Attachment>, AppError> {
    let expected = state.config.drive.webhook_token.as_str();
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if expected.is_empty() || provided != Some(expected) {
        warn!("Rejected storage webhook with missing or wrong token");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::validation(format!("Malformed webhook payload: {e}")))?;
    Ok(Json(state.attachments.confirm_upload(&payload).await?))
}

pub fn configure_drive_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/tasks/attachments/presign-upload",
            post(handle_presign_upload),
        )
        .route("/tasks/attachments", get(handle_attachment_list))
        .route("/webhooks/minio/attachments", post(handle_storage_webhook))
}
