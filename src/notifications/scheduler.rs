use chrono::{DateTime, Utc};
use cron::Schedule;
use log::{info, warn};
use std::str::FromStr;

use super::queue::{NotificationJob, NotificationQueue};

#[derive(Debug, thiserror::Error)]
#[error("Invalid cron expression \"{expression}\": {reason}")]
pub struct ScheduleError {
    expression: String,
    reason: String,
}

pub fn parse_schedule(expression: &str) -> Result<Schedule, ScheduleError> {
    Schedule::from_str(expression).map_err(|e| ScheduleError {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

pub fn next_run(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

/// Enqueues a top tasks report at every firing of `schedule`, forever.
pub async fn run_report_schedule(schedule: Schedule, queue: NotificationQueue) {
    loop {
        let now = Utc::now();
        let Some(next) = next_run(&schedule, now) else {
            warn!("Report schedule has no upcoming runs, stopping");
            return;
        };
        info!("Next top tasks report at {next}");

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        queue.enqueue(NotificationJob::TopTasksReport);
    }
}
