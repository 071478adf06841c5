use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;

use super::SearchHit;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub query: String,
}

pub async fn handle_search(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    Ok(Json(state.search.search(&params.target, &params.query).await?))
}

pub fn configure_search_routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(handle_search))
}
