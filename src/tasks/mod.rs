pub mod aggregation;
pub mod handlers;
pub mod lifecycle;
pub mod time_tracking;
pub mod types;

pub use aggregation::AggregationService;
pub use handlers::configure_tasks_routes;
pub use lifecycle::TaskLifecycle;
pub use time_tracking::TimeTracker;
