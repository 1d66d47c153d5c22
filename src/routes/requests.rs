use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::{Body, Id, Params, SharerId};
use crate::ids::RequestId;
use crate::request::RequestView;
use crate::state::AppState;
use crate::validation::{PageParams, RequestBody};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_own_requests).post(create_request))
        .route("/requests/all", get(list_other_requests))
        .route("/requests/{id}", get(get_request))
}

async fn create_request(
    State(state): State<AppState>,
    SharerId(requester): SharerId,
    Body(body): Body<RequestBody>,
) -> AppResult<Json<RequestView>> {
    tracing::info!(user_id = %requester, "Create item request");
    let request = state.requests.create(requester, body.validate()?).await?;
    Ok(Json(request))
}

async fn list_own_requests(
    State(state): State<AppState>,
    SharerId(requester): SharerId,
    Params(params): Params<PageParams>,
) -> AppResult<Json<Vec<RequestView>>> {
    tracing::info!(user_id = %requester, "List own item requests");
    Ok(Json(state.requests.own(requester, params.page()?).await?))
}

async fn list_other_requests(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    Params(params): Params<PageParams>,
) -> AppResult<Json<Vec<RequestView>>> {
    tracing::info!(user_id = %user, "List other users' item requests");
    Ok(Json(state.requests.others(user, params.page()?).await?))
}

async fn get_request(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    Id(id): Id,
) -> AppResult<Json<RequestView>> {
    tracing::info!(user_id = %user, request_id = id, "Get item request");
    Ok(Json(state.requests.get(user, RequestId(id)).await?))
}
