//! HTTP routes under `/tasks`.

pub mod comments;
pub mod tasks;
pub mod time_logs;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_tasks_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/tasks",
            get(tasks::handle_task_list).post(tasks::handle_task_create),
        )
        .route(
            "/tasks/top-logged-tasks-last-month",
            get(tasks::handle_top_logged_tasks_last_month),
        )
        .route(
            "/tasks/comments",
            get(comments::handle_comment_list).post(comments::handle_comment_create),
        )
        .route("/tasks/time-logs", get(time_logs::handle_time_log_list))
        .route(
            "/tasks/time-logs/start-timer",
            post(time_logs::handle_start_timer),
        )
        .route(
            "/tasks/time-logs/stop-timer",
            patch(time_logs::handle_stop_timer),
        )
        .route("/tasks/time-logs/log-date", post(time_logs::handle_log_date))
        .route(
            "/tasks/time-logs/:id",
            delete(time_logs::handle_time_log_delete),
        )
        .route(
            "/tasks/:id",
            get(tasks::handle_task_get)
                .patch(tasks::handle_task_update)
                .delete(tasks::handle_task_delete),
        )
        .route("/tasks/:id/complete", patch(tasks::handle_task_complete))
        .route(
            "/tasks/:id/assign-user",
            patch(tasks::handle_task_assign_user),
        )
}
