use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::shared::error::AppError;

pub const TASK_ALREADY_COMPLETED: &str = "Task already completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Canceled,
    Archived,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
            Self::Canceled => write!(f, "Canceled"),
            Self::Archived => write!(f, "Archived"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(Self::Open),
            "In Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Canceled" => Ok(Self::Canceled),
            "Archived" => Ok(Self::Archived),
            other => Err(format!("Unknown task status: {other}")),
        }
    }
}

/// What a requested status change amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// Guarded completion; fans out the completion notification.
    Complete,
    Set(TaskStatus),
}

impl TaskStatus {
    pub fn transition(self, next: TaskStatus) -> Result<StatusTransition, AppError> {
        match (self, next) {
            (Self::Completed, Self::Completed) => {
                Err(AppError::Conflict(TASK_ALREADY_COMPLETED.to_string()))
            }
            (Self::Open | Self::InProgress | Self::Canceled | Self::Archived, Self::Completed) => {
                Ok(StatusTransition::Complete)
            }
            (_, next @ (Self::Open | Self::InProgress | Self::Canceled | Self::Archived)) => {
                Ok(StatusTransition::Set(next))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub assignee_id: Uuid,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assignee_id: Uuid,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub assignee: Option<Uuid>,
    pub status: Option<TaskStatus>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub task_id: Uuid,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeLog {
    pub fn is_active_timer(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }
}

/// Floor of the elapsed minutes.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    let minutes = (end - start).num_seconds().div_euclid(60);
    i32::try_from(minutes).unwrap_or(if minutes < 0 { i32::MIN } else { i32::MAX })
}

#[derive(Debug, Clone)]
pub struct NewTimeLog {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub start_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentStatus {
    Pending,
    Uploaded,
    Failed,
}

impl fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Uploaded => write!(f, "Uploaded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for AttachmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Uploaded" => Ok(Self::Uploaded),
            "Failed" => Ok(Self::Failed),
            other => Err(format!("Unknown attachment status: {other}")),
        }
    }
}

impl AttachmentStatus {
    /// Uploaded is terminal and nothing returns to Pending. Re-confirming an
    /// upload is accepted so repeated webhook deliveries stay harmless.
    pub fn can_transition_to(self, next: AttachmentStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Uploaded | Self::Failed) => true,
            (Self::Uploaded, Self::Uploaded) => true,
            (Self::Failed, Self::Uploaded) => true,
            (_, Self::Pending) | (Self::Uploaded, Self::Failed) | (Self::Failed, Self::Failed) => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub filename: Option<String>,
    pub status: AttachmentStatus,
    pub bucket: Option<String>,
    pub content_type: Option<String>,
    pub object_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub task_id: Uuid,
    pub filename: Option<String>,
    pub bucket: Option<String>,
    pub content_type: Option<String>,
    pub object_name: String,
}

// ---------------------------------------------------------------------------
// API request/response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignUserRequest {
    pub assignee: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskListItem {
    pub id: Uuid,
    pub title: String,
    pub total_logged_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assignee: Uuid,
    pub comments: Vec<CommentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_logged_minutes: Option<i64>,
}

impl TaskDetail {
    pub fn new(task: Task, comments: Vec<Comment>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            assignee: task.assignee_id,
            comments: comments.into_iter().map(CommentResponse::from).collect(),
            total_logged_minutes: None,
        }
    }

    pub fn with_total_logged_minutes(mut self, minutes: i64) -> Self {
        self.total_logged_minutes = Some(minutes);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub task: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub text: String,
    pub task: Uuid,
    pub author: Uuid,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            task: comment.task_id,
            author: comment.author_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRefQuery {
    pub task: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartTimerRequest {
    pub task: Uuid,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartTimerResponse {
    pub id: Uuid,
    pub task: Uuid,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopTimerRequest {
    pub task: Uuid,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopTimerResponse {
    pub id: Uuid,
    pub task: Uuid,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogDateRequest {
    pub task: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogDateResponse {
    pub id: Uuid,
    pub task: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresignUploadRequest {
    pub task: Uuid,
    pub filename: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresignUploadResponse {
    pub id: Uuid,
    pub object_name: String,
    pub upload_url: String,
}
