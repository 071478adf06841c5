//! Combines the routes of every module into one router.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::drive::handlers::configure_drive_routes;
use crate::search::handlers::configure_search_routes;
use crate::shared::state::AppState;
use crate::tasks::configure_tasks_routes;
use crate::users::configure_users_routes;

pub async fn health() -> Json<Value> {
    Json(json!({ "live": true }))
}

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(configure_users_routes())
        .merge(configure_tasks_routes())
        .merge(configure_drive_routes())
        .merge(configure_search_routes())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    configure_api_routes()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
