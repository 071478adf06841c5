pub mod api_router;
pub mod auth;
pub mod cache;
pub mod config;
pub mod drive;
pub mod notifications;
pub mod search;
pub mod shared;
pub mod store;
pub mod tasks;
pub mod users;
