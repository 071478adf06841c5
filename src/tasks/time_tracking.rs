use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::store::Store;
use crate::tasks::types::{minutes_between, NewTimeLog, TimeLog};

pub const ACTIVE_TIMER_NOT_FOUND: &str = "Active timer not found for this task.";
pub const NON_POSITIVE_DURATION: &str = "Timelog duration must be greater than zero.";
pub const DURATION_TOO_SMALL: &str = "Ensure duration_minutes is greater than or equal to 1.";
pub const TASK_NOT_FOUND: &str = "Task not found.";

/// Timer and direct-log bookkeeping for time spent on tasks.
pub struct TimeTracker {
    store: Arc<dyn Store>,
}

impl TimeTracker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn ensure_task(&self, task_id: Uuid) -> Result<(), AppError> {
        match self.store.get_task(task_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(TASK_NOT_FOUND)),
        }
    }

    /// Opens a timer on `task_id`, closing whatever timer the user had running.
    pub async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> Result<TimeLog, AppError> {
        self.ensure_task(task_id).await?;
        let log = self.store.start_timer(user_id, task_id, start_time).await?;
        info!("User {user_id} started timer {} on task {task_id}", log.id);
        Ok(log)
    }

    pub async fn stop_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> Result<TimeLog, AppError> {
        let timer = self
            .store
            .active_timer(user_id, task_id)
            .await?
            .filter(TimeLog::is_active_timer)
            .ok_or_else(|| AppError::not_found(ACTIVE_TIMER_NOT_FOUND))?;
        let Some(start_time) = timer.start_time else {
            return Err(AppError::not_found(ACTIVE_TIMER_NOT_FOUND));
        };

        if end_time <= start_time {
            return Err(AppError::validation(NON_POSITIVE_DURATION));
        }

        let duration = minutes_between(start_time, end_time);
        let log = self
            .store
            .close_timer(timer.id, end_time, duration)
            .await?
            .ok_or_else(|| AppError::not_found(ACTIVE_TIMER_NOT_FOUND))?;
        info!("User {user_id} stopped timer {} after {duration} min", log.id);
        Ok(log)
    }

    pub async fn log_date(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> Result<TimeLog, AppError> {
        if duration_minutes < 1 {
            return Err(AppError::validation(DURATION_TOO_SMALL));
        }
        self.ensure_task(task_id).await?;

        let log = self
            .store
            .insert_time_log(NewTimeLog {
                user_id,
                task_id,
                start_time: None,
                date: Some(date),
                duration_minutes: Some(duration_minutes),
            })
            .await?;
        Ok(log)
    }

    pub async fn list(&self, task_id: Option<Uuid>) -> Result<Vec<TimeLog>, AppError> {
        Ok(self.store.list_time_logs(task_id).await?)
    }

    /// Users may only remove their own entries; anything else reads as absent.
    pub async fn delete(&self, user_id: Uuid, log_id: Uuid) -> Result<(), AppError> {
        let log = self
            .store
            .get_time_log(log_id)
            .await?
            .filter(|log| log.user_id == user_id)
            .ok_or_else(|| AppError::not_found("Time log not found."))?;
        self.store.delete_time_log(log.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::TestFixture;
    use crate::store::{TimeLogStore, TIMER_OVERLAP};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_start_then_stop_after_an_hour() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let task = fx.task("Write report", user.id).await;
        let tracker = TimeTracker::new(fx.store.clone());

        let started = tracker.start_timer(user.id, task.id, t0()).await.unwrap();
        assert!(started.is_active_timer());

        let stopped = tracker
            .stop_timer(user.id, task.id, t0() + Duration::minutes(60))
            .await
            .unwrap();
        assert_eq!(stopped.id, started.id);
        assert_eq!(stopped.duration_minutes, Some(60));
        assert_eq!(stopped.end_time, Some(t0() + Duration::minutes(60)));
    }

    #[tokio::test]
    async fn test_at_most_one_open_timer_per_user() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let a = fx.task("A", user.id).await;
        let b = fx.task("B", user.id).await;
        let tracker = TimeTracker::new(fx.store.clone());

        tracker.start_timer(user.id, a.id, t0()).await.unwrap();
        tracker
            .start_timer(user.id, b.id, t0() + Duration::minutes(30))
            .await
            .unwrap();
        tracker
            .start_timer(user.id, a.id, t0() + Duration::minutes(45))
            .await
            .unwrap();

        let logs = fx.store.list_time_logs(None).await.unwrap();
        let open: Vec<_> = logs.iter().filter(|l| l.is_active_timer()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].task_id, a.id);

        // the first timer was closed when the second one started
        let first = logs
            .iter()
            .find(|l| l.start_time == Some(t0()))
            .unwrap();
        assert_eq!(first.end_time, Some(t0() + Duration::minutes(30)));
        assert_eq!(first.duration_minutes, Some(30));
    }

    #[tokio::test]
    async fn test_starting_does_not_touch_other_users_timers() {
        let fx = TestFixture::new();
        let alice = fx.user("alice").await;
        let bob = fx.user("bobby").await;
        let task = fx.task("A", alice.id).await;
        let tracker = TimeTracker::new(fx.store.clone());

        tracker.start_timer(alice.id, task.id, t0()).await.unwrap();
        tracker
            .start_timer(bob.id, task.id, t0() + Duration::minutes(5))
            .await
            .unwrap();

        let alice_timer = fx.store.active_timer(alice.id, task.id).await.unwrap();
        let bob_timer = fx.store.active_timer(bob.id, task.id).await.unwrap();
        assert!(alice_timer.is_some());
        assert!(bob_timer.is_some());
    }

    #[tokio::test]
    async fn test_start_before_open_timer_is_rejected() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let task = fx.task("A", user.id).await;
        let tracker = TimeTracker::new(fx.store.clone());

        tracker.start_timer(user.id, task.id, t0()).await.unwrap();
        let err = tracker
            .start_timer(user.id, task.id, t0() - Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == TIMER_OVERLAP));
    }

    #[tokio::test]
    async fn test_start_on_missing_task() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let tracker = TimeTracker::new(fx.store.clone());

        let err = tracker
            .start_timer(user.id, Uuid::new_v4(), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_without_open_timer() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let task = fx.task("A", user.id).await;
        let tracker = TimeTracker::new(fx.store.clone());

        let err = tracker
            .stop_timer(user.id, task.id, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), ACTIVE_TIMER_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stop_with_end_not_after_start() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let task = fx.task("A", user.id).await;
        let tracker = TimeTracker::new(fx.store.clone());
        tracker.start_timer(user.id, task.id, t0()).await.unwrap();

        for end in [t0(), t0() - Duration::minutes(10)] {
            let err = tracker.stop_timer(user.id, task.id, end).await.unwrap_err();
            assert_eq!(err.to_string(), NON_POSITIVE_DURATION);
        }
        // the timer is still running
        let running = fx.store.active_timer(user.id, task.id).await.unwrap();
        assert!(running.is_some());
    }

    #[tokio::test]
    async fn test_log_date_requires_positive_duration() {
        let fx = TestFixture::new();
        let user = fx.user("alice").await;
        let task = fx.task("A", user.id).await;
        let tracker = TimeTracker::new(fx.store.clone());
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let err = tracker
            .log_date(user.id, task.id, date, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let log = tracker.log_date(user.id, task.id, date, 45).await.unwrap();
        assert_eq!(log.date, Some(date));
        assert_eq!(log.duration_minutes, Some(45));
        assert!(!log.is_active_timer());
    }

    #[tokio::test]
    async fn test_delete_only_own_logs() {
        let fx = TestFixture::new();
        let alice = fx.user("alice").await;
        let bob = fx.user("bobby").await;
        let task = fx.task("A", alice.id).await;
        let tracker = TimeTracker::new(fx.store.clone());
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let log = tracker.log_date(alice.id, task.id, date, 10).await.unwrap();

        let err = tracker.delete(bob.id, log.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        tracker.delete(alice.id, log.id).await.unwrap();
        assert!(tracker.list(Some(task.id)).await.unwrap().is_empty());
    }
}
