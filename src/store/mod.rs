//! Persistence contracts.
//!
//! Each entity gets its own trait so that components depend only on what
//! they touch. [`Store`] bundles them for the application state.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::tasks::aggregation::{MonthWindow, TopTask};
use crate::tasks::types::{
    Attachment, AttachmentStatus, Comment, NewAttachment, NewComment, NewTask, NewTimeLog, Task,
    TaskFilter, TaskPatch, TimeLog,
};
use crate::users::types::{NewUser, User};

pub use postgres::PgStore;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Connection(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("{0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raised when a new timer would start before the user's open one.
pub const TIMER_OVERLAP: &str = "Timer start must be after the start of the open timer.";

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task>;
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;
    /// Flips the status to Completed only if it is not already. `None` when
    /// the task is missing or was completed concurrently.
    async fn mark_completed(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;
    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn list_comments(&self, task_id: Option<Uuid>) -> StoreResult<Vec<Comment>>;
}

/// Filter for summed durations grouped by task.
#[derive(Debug, Clone, Copy)]
pub struct LoggedTotalsQuery {
    pub user_id: Option<Uuid>,
    pub window: Option<MonthWindow>,
    pub limit: i64,
}

#[async_trait]
pub trait TimeLogStore: Send + Sync {
    /// Closes every open timer of `user_id` at `start_time` and opens a new
    /// one, atomically.
    async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> StoreResult<TimeLog>;
    async fn active_timer(&self, user_id: Uuid, task_id: Uuid) -> StoreResult<Option<TimeLog>>;
    /// `None` when the log is gone or already closed.
    async fn close_timer(
        &self,
        id: Uuid,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> StoreResult<Option<TimeLog>>;
    async fn insert_time_log(&self, log: NewTimeLog) -> StoreResult<TimeLog>;
    async fn get_time_log(&self, id: Uuid) -> StoreResult<Option<TimeLog>>;
    async fn list_time_logs(&self, task_id: Option<Uuid>) -> StoreResult<Vec<TimeLog>>;
    async fn delete_time_log(&self, id: Uuid) -> StoreResult<bool>;
    /// Tasks without logs are absent from the map.
    async fn total_logged_minutes(&self, task_ids: Vec<Uuid>) -> StoreResult<HashMap<Uuid, i64>>;
    async fn logged_totals(&self, query: LoggedTotalsQuery) -> StoreResult<Vec<TopTask>>;
    async fn user_logged_minutes(&self, user_id: Uuid, window: MonthWindow) -> StoreResult<i64>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn insert_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment>;
    async fn list_attachments(&self, task_id: Option<Uuid>) -> StoreResult<Vec<Attachment>>;
    async fn get_attachment_by_object_name(
        &self,
        object_name: &str,
    ) -> StoreResult<Option<Attachment>>;
    async fn set_attachment_status(
        &self,
        id: Uuid,
        status: AttachmentStatus,
    ) -> StoreResult<Option<Attachment>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] on a duplicate username or email.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_users(&self, ids: Vec<Uuid>) -> StoreResult<Vec<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
}

pub trait Store: TaskStore + CommentStore + TimeLogStore + AttachmentStore + UserStore {}

impl<T> Store for T where
    T: TaskStore + CommentStore + TimeLogStore + AttachmentStore + UserStore
{
}

