use log::{error, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{LoggedTotalsQuery, Store, StoreError};
use crate::tasks::aggregation::TopTask;

use super::mailer::{MailError, Mailer, OutgoingEmail};
use super::queue::NotificationJob;
use super::templates;

pub const REPORT_LIMIT: i64 = 20;
pub const REPORT_SUBJECT: &str = "Top tasks by logged time";

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error("Validation error: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Builds and sends notification emails. Every entry point reports success
/// as a bool and logs failures instead of returning them.
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    pub async fn dispatch(&self, job: NotificationJob) -> bool {
        match job {
            NotificationJob::TaskAssigned { task_id } => self.notify_assigned(task_id).await,
            NotificationJob::TaskCompleted {
                task_id,
                recipient_ids,
            } => self.notify_completed(task_id, recipient_ids).await,
            NotificationJob::TaskCommented { comment_id } => {
                self.notify_commented(comment_id).await
            }
            NotificationJob::TopTasksReport => self.top_tasks_report().await,
        }
    }

    fn finish(job: &str, result: Result<bool, DispatchError>) -> bool {
        match result {
            Ok(sent) => sent,
            Err(e) => {
                error!("{job}: {e}");
                false
            }
        }
    }

    async fn send(
        &self,
        to: Vec<String>,
        subject: String,
        html: String,
    ) -> Result<bool, DispatchError> {
        let text = templates::strip_tags(&html);
        self.mailer
            .send(OutgoingEmail {
                to,
                subject,
                html,
                text,
            })
            .await?;
        Ok(true)
    }

    pub async fn notify_assigned(&self, task_id: Uuid) -> bool {
        Self::finish("notify_assigned", self.try_notify_assigned(task_id).await)
    }

    async fn try_notify_assigned(&self, task_id: Uuid) -> Result<bool, DispatchError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(DispatchError::Validation("Task not found"))?;
        let assignee = self
            .store
            .get_user(task.assignee_id)
            .await?
            .ok_or(DispatchError::Validation("Assignee does not have an email address."))?;
        let email = assignee
            .email_address()
            .ok_or(DispatchError::Validation("Assignee does not have an email address."))?
            .to_string();

        let subject = format!("You have been assigned a task: {}", task.title);
        let html = templates::task_assigned(&task, &assignee);
        self.send(vec![email], subject, html).await
    }

    pub async fn notify_completed(&self, task_id: Uuid, recipient_ids: Vec<Uuid>) -> bool {
        Self::finish(
            "notify_completed",
            self.try_notify_completed(task_id, recipient_ids).await,
        )
    }

    async fn try_notify_completed(
        &self,
        task_id: Uuid,
        recipient_ids: Vec<Uuid>,
    ) -> Result<bool, DispatchError> {
        let recipients = self.store.get_users(recipient_ids).await?;
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(DispatchError::Validation("Task not found"))?;

        if recipients.is_empty() {
            return Err(DispatchError::Validation("Recipients not found"));
        }
        let mut emails: Vec<String> = recipients
            .iter()
            .filter_map(|user| user.email_address().map(str::to_string))
            .collect();
        emails.sort();
        emails.dedup();
        if emails.is_empty() {
            return Err(DispatchError::Validation("No valid emails in recipients list."));
        }

        let subject = format!("Task completed: {}", task.title);
        let html = templates::task_completed(&task);
        self.send(emails, subject, html).await
    }

    pub async fn notify_commented(&self, comment_id: Uuid) -> bool {
        Self::finish(
            "notify_commented",
            self.try_notify_commented(comment_id).await,
        )
    }

    async fn try_notify_commented(&self, comment_id: Uuid) -> Result<bool, DispatchError> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or(DispatchError::Validation("Comment does not exist."))?;
        let task = self
            .store
            .get_task(comment.task_id)
            .await?
            .ok_or(DispatchError::Validation("Task not found"))?;
        let assignee = self
            .store
            .get_user(task.assignee_id)
            .await?
            .ok_or(DispatchError::Validation("Assignee does not have an email address."))?;
        let email = assignee
            .email_address()
            .ok_or(DispatchError::Validation("Assignee does not have an email address."))?
            .to_string();

        if assignee.id == comment.author_id {
            return Ok(false);
        }

        let author = self.store.get_user(comment.author_id).await?;
        let subject = format!("New comment on your task: {}", task.title);
        let html = templates::task_commented(&task, &assignee, author.as_ref(), &comment);
        self.send(vec![email], subject, html).await
    }

    pub async fn top_tasks_report(&self) -> bool {
        Self::finish("top_tasks_report", self.try_top_tasks_report().await)
    }

    async fn try_top_tasks_report(&self) -> Result<bool, DispatchError> {
        let tasks: Vec<TopTask> = self
            .store
            .logged_totals(LoggedTotalsQuery {
                user_id: None,
                window: None,
                limit: REPORT_LIMIT,
            })
            .await?;
        if tasks.is_empty() {
            return Err(DispatchError::Validation("No tasks with logged time."));
        }

        let emails: Vec<String> = self
            .store
            .list_users()
            .await?
            .iter()
            .filter_map(|user| user.email_address().map(str::to_string))
            .collect();
        if emails.is_empty() {
            return Err(DispatchError::Validation("No users with an email address."));
        }

        info!("Sending top tasks report ({} tasks) to {} users", tasks.len(), emails.len());
        let html = templates::top_tasks_report(&tasks);
        self.send(emails, REPORT_SUBJECT.to_string(), html).await
    }
}
