use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::{Body, Id};
use crate::ids::UserId;
use crate::state::AppState;
use crate::user::User;
use crate::validation::UserBody;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

async fn create_user(
    State(state): State<AppState>,
    Body(body): Body<UserBody>,
) -> AppResult<Json<User>> {
    tracing::info!("Create user");
    let user = state.users.create(body.validate()?).await?;
    Ok(Json(user))
}

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    tracing::info!("List users");
    Ok(Json(state.users.list().await?))
}

async fn get_user(State(state): State<AppState>, Id(id): Id) -> AppResult<Json<User>> {
    tracing::info!("Get user {}", id);
    Ok(Json(state.users.get(UserId(id)).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Id(id): Id,
    Body(body): Body<UserBody>,
) -> AppResult<Json<User>> {
    tracing::info!("Update user {}", id);
    let user = state.users.update(UserId(id), body.validate_patch()?).await?;
    Ok(Json(user))
}

async fn delete_user(State(state): State<AppState>, Id(id): Id) -> AppResult<()> {
    tracing::info!("Delete user {}", id);
    state.users.delete(UserId(id)).await
}
