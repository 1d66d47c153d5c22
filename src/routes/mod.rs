pub mod bookings;
pub mod items;
pub mod requests;
pub mod users;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::db::RepositoryError;
use crate::error::AppResult;
use crate::state::AppState;

/// Every core endpoint, with tracing, bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(users::router())
        .merge(items::router())
        .merge(bookings::router())
        .merge(requests::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let conn = state.db.get().map_err(RepositoryError::from)?;
    conn.query_row("SELECT 1", [], |_| Ok(()))
        .map_err(RepositoryError::from)?;
    Ok(Json(json!({ "status": "ok" })))
}
