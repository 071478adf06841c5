use log::info;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::notifications::{NotificationJob, NotificationQueue};
use crate::search::SearchSynchronizer;
use crate::shared::error::AppError;
use crate::store::Store;
use crate::tasks::types::{
    Comment, CreateCommentRequest, CreateTaskRequest, NewComment, NewTask, StatusTransition, Task,
    TaskFilter, TaskPatch, TaskStatus, UpdateTaskRequest, TASK_ALREADY_COMPLETED,
};

pub const TITLE_MAX_CHARS: usize = 100;
const TASK_NOT_FOUND: &str = "Task not found.";

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title may not be blank."));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::validation(format!(
            "Ensure title has no more than {TITLE_MAX_CHARS} characters."
        )));
    }
    Ok(title.to_string())
}

/// Orchestrates task and comment writes. After each successful write the
/// search index is updated in-process and notifications are queued.
pub struct TaskLifecycle {
    store: Arc<dyn Store>,
    search: Arc<SearchSynchronizer>,
    notifications: NotificationQueue,
}

impl TaskLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        search: Arc<SearchSynchronizer>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            store,
            search,
            notifications,
        }
    }

    async fn load(&self, task_id: Uuid) -> Result<Task, AppError> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), AppError> {
        match self.store.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::validation(format!(
                "Invalid pk \"{user_id}\" - object does not exist."
            ))),
        }
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, AppError> {
        Ok(self.store.list_tasks(filter).await?)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<(Task, Vec<Comment>), AppError> {
        let task = self.load(task_id).await?;
        let comments = self.store.list_comments(Some(task_id)).await?;
        Ok((task, comments))
    }

    /// New tasks are always assigned to their creator.
    pub async fn create_task(
        &self,
        user_id: Uuid,
        req: CreateTaskRequest,
    ) -> Result<Task, AppError> {
        let title = validate_title(&req.title)?;
        let task = self
            .store
            .insert_task(NewTask {
                title,
                description: req.description,
                assignee_id: user_id,
                status: req.status.unwrap_or(TaskStatus::Open),
            })
            .await?;
        info!("Task {} created by {user_id}", task.id);

        self.search.task_created(&task).await;
        self.notifications
            .enqueue(NotificationJob::TaskAssigned { task_id: task.id });
        Ok(task)
    }

    /// Partial update. A status change to Completed goes through the same
    /// guard and notification as [`Self::complete_task`].
    pub async fn update_task(
        &self,
        task_id: Uuid,
        req: UpdateTaskRequest,
    ) -> Result<Task, AppError> {
        let current = self.load(task_id).await?;

        let mut patch = TaskPatch {
            title: req.title.as_deref().map(validate_title).transpose()?,
            description: req.description,
            status: None,
            assignee_id: req.assignee,
        };
        if let Some(assignee) = patch.assignee_id {
            self.ensure_user(assignee).await?;
        }

        let completing = match req.status {
            Some(next) => match current.status.transition(next)? {
                StatusTransition::Complete => true,
                StatusTransition::Set(status) => {
                    patch.status = Some(status);
                    false
                }
            },
            None => false,
        };

        if completing {
            // a lost completion race must leave the task untouched
            self.claim_completion(task_id).await?;
        }

        let task = self
            .store
            .update_task(task_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))?;
        self.search.task_updated(&task).await;

        if completing {
            self.notify_completion(&task).await?;
        }
        if task.assignee_id != current.assignee_id {
            self.notifications
                .enqueue(NotificationJob::TaskAssigned { task_id });
        }
        Ok(task)
    }

    pub async fn complete_task(&self, task_id: Uuid) -> Result<Task, AppError> {
        let current = self.load(task_id).await?;
        current.status.transition(TaskStatus::Completed)?;

        let task = self.claim_completion(task_id).await?;
        self.search.task_updated(&task).await;
        self.notify_completion(&task).await?;
        Ok(task)
    }

    /// Conditional update: a concurrent completion leaves nothing to flip.
    async fn claim_completion(&self, task_id: Uuid) -> Result<Task, AppError> {
        self.store
            .mark_completed(task_id)
            .await?
            .ok_or_else(|| AppError::Conflict(TASK_ALREADY_COMPLETED.to_string()))
    }

    async fn notify_completion(&self, task: &Task) -> Result<(), AppError> {
        let comments = self.store.list_comments(Some(task.id)).await?;
        let recipients: BTreeSet<Uuid> = comments
            .iter()
            .map(|comment| comment.author_id)
            .chain(std::iter::once(task.assignee_id))
            .collect();

        info!(
            "Task {} completed, notifying {} user(s)",
            task.id,
            recipients.len()
        );
        self.notifications.enqueue(NotificationJob::TaskCompleted {
            task_id: task.id,
            recipient_ids: recipients.into_iter().collect(),
        });
        Ok(())
    }

    /// Reassigns unconditionally; the assignee is notified even when unchanged.
    pub async fn assign_user(&self, task_id: Uuid, assignee_id: Uuid) -> Result<Task, AppError> {
        self.load(task_id).await?;
        self.ensure_user(assignee_id).await?;

        let task = self
            .store
            .update_task(
                task_id,
                TaskPatch {
                    assignee_id: Some(assignee_id),
                    ..TaskPatch::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found(TASK_NOT_FOUND))?;

        self.search.task_updated(&task).await;
        self.notifications
            .enqueue(NotificationJob::TaskAssigned { task_id });
        Ok(task)
    }

    pub async fn delete_task(&self, task_id: Uuid) -> Result<(), AppError> {
        let comment_ids: Vec<Uuid> = self
            .store
            .list_comments(Some(task_id))
            .await?
            .into_iter()
            .map(|comment| comment.id)
            .collect();

        if !self.store.delete_task(task_id).await? {
            return Err(AppError::not_found(TASK_NOT_FOUND));
        }
        info!("Task {task_id} deleted");
        self.search.task_deleted(task_id, &comment_ids).await;
        Ok(())
    }

    pub async fn create_comment(
        &self,
        author_id: Uuid,
        req: CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        if req.text.trim().is_empty() {
            return Err(AppError::validation("Comment text may not be blank."));
        }
        if self.store.get_task(req.task).await?.is_none() {
            return Err(AppError::validation(format!(
                "Invalid pk \"{}\" - object does not exist.",
                req.task
            )));
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                text: req.text,
                task_id: req.task,
                author_id,
            })
            .await?;

        self.search.comment_created(&comment).await;
        self.notifications.enqueue(NotificationJob::TaskCommented {
            comment_id: comment.id,
        });
        Ok(comment)
    }

    pub async fn list_comments(&self, task_id: Option<Uuid>) -> Result<Vec<Comment>, AppError> {
        Ok(self.store.list_comments(task_id).await?)
    }
}
