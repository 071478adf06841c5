use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::store::Store;
use crate::tasks::types::{
    Attachment, AttachmentStatus, NewAttachment, PresignUploadRequest, PresignUploadResponse,
};

use super::ObjectStorage;

/// `tasks/{task}/{random}-{filename}`, keeping only the last path segment
/// of the client-supplied name.
pub fn object_name_for(task_id: Uuid, filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let base = if base.is_empty() { "upload" } else { base };
    format!("tasks/{task_id}/{}-{base}", Uuid::new_v4())
}

/// Object key of the first record of an S3 event notification, URL-decoded.
pub fn event_object_key(payload: &Value) -> Option<String> {
    let raw = payload
        .get("Records")?
        .get(0)?
        .get("s3")?
        .get("object")?
        .get("key")?
        .as_str()?;
    // S3 event keys encode spaces as '+'
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).ok()?;
    Some(decoded.into_owned())
}

pub struct AttachmentService {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    /// Records a Pending attachment and returns where to upload its body.
    pub async fn presign_upload(
        &self,
        req: PresignUploadRequest,
    ) -> Result<PresignUploadResponse, AppError> {
        if req.filename.trim().is_empty() {
            return Err(AppError::validation("filename is required"));
        }
        if self.store.get_task(req.task).await?.is_none() {
            return Err(AppError::validation("Task does not exist."));
        }

        let object_name = object_name_for(req.task, &req.filename);
        let upload_url = self
            .storage
            .presign_put(&object_name, req.content_type.as_deref())
            .await?;

        let attachment = self
            .store
            .insert_attachment(NewAttachment {
                task_id: req.task,
                filename: Some(req.filename),
                bucket: Some(self.storage.bucket().to_string()),
                content_type: req.content_type,
                object_name,
            })
            .await?;

        Ok(PresignUploadResponse {
            id: attachment.id,
            object_name: attachment.object_name,
            upload_url,
        })
    }

    pub async fn list(&self, task_id: Option<Uuid>) -> Result<Vec<Attachment>, AppError> {
        Ok(self.store.list_attachments(task_id).await?)
    }

    /// Handles an object-created notification from storage.
    pub async fn confirm_upload(&self, payload: &Value) -> Result<Attachment, AppError> {
        let object_key = event_object_key(payload)
            .ok_or_else(|| AppError::validation("Malformed storage event payload"))?;

        let attachment = self
            .store
            .get_attachment_by_object_name(&object_key)
            .await?
            .ok_or_else(|| AppError::not_found("Attachment not found."))?;

        if attachment.status == AttachmentStatus::Uploaded {
            return Ok(attachment);
        }
        let status = attachment.status;
        if !status.can_transition_to(AttachmentStatus::Uploaded) {
            warn!(
                "Attachment {} cannot move from {} to Uploaded",
                attachment.id, attachment.status
            );
            return Err(AppError::Conflict("Attachment status cannot change.".to_string()));
        }

        let updated = self
            .store
            .set_attachment_status(attachment.id, AttachmentStatus::Uploaded)
            .await?
            .ok_or_else(|| AppError::not_found("Attachment not found."))?;
        info!("Attachment {} uploaded as {object_key}", updated.id);
        Ok(updated)
    }
}
