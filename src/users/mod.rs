pub mod accounts;
pub mod handlers;
pub mod types;

pub use accounts::AccountService;
pub use handlers::configure_users_routes;
