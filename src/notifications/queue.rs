use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use super::dispatcher::NotificationDispatcher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationJob {
    TaskAssigned { task_id: Uuid },
    TaskCompleted { task_id: Uuid, recipient_ids: Vec<Uuid> },
    TaskCommented { comment_id: Uuid },
    TopTasksReport,
}

/// Sending half of the notification channel. Enqueueing never blocks.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, job: NotificationJob) {
        debug!("Enqueueing notification {job:?}");
        if let Err(e) = self.sender.send(job) {
            error!("Notification worker is gone, dropping {:?}", e.0);
        }
    }
}

/// Drains the channel, running at most `workers` jobs at once. Returns when
/// every sender has been dropped.
pub async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<NotificationJob>,
    dispatcher: Arc<NotificationDispatcher>,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    info!("Notification worker started with {} slot(s)", workers.max(1));

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let sent = dispatcher.dispatch(job.clone()).await;
            debug!("Notification {job:?} finished, sent={sent}");
            drop(permit);
        });
    }

    info!("Notification worker stopped");
}
