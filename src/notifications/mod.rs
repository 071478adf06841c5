//! Email notifications for task events and the weekly time report.
//!
//! Producers enqueue a [`NotificationJob`]; the worker started from `main`
//! hands each job to the [`NotificationDispatcher`].

pub mod dispatcher;
pub mod mailer;
pub mod queue;
pub mod scheduler;
pub mod templates;

pub use dispatcher::NotificationDispatcher;
pub use mailer::{MailError, Mailer, OutgoingEmail, SmtpMailer};
pub use queue::{run_worker, NotificationJob, NotificationQueue};
pub use scheduler::{parse_schedule, run_report_schedule};
