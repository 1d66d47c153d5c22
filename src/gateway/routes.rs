// Gateway endpoints: check shape and range, then hand the request to the core.
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::extractors::{Body, Id, Params, SharerId};
use crate::gateway::client::GatewayClient;
use crate::validation::{
    ApprovalParams, BookingBody, CommentBody, ItemBody, PageParams, RequestBody, SearchParams,
    StateParams, UserBody,
};

pub fn router() -> Router<GatewayClient> {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/items", get(list_items).post(create_item))
        .route("/items/search", get(search_items))
        .route(
            "/items/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/{id}/comment", post(add_comment))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/owner", get(list_owner_bookings))
        .route("/bookings/{id}", get(get_booking).patch(approve_booking))
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/all", get(list_all_requests))
        .route("/requests/{id}", get(get_request))
}

fn checked<T>(operation: &str, result: AppResult<T>) -> AppResult<T> {
    result.inspect_err(|e| tracing::warn!(operation, "Rejected at gateway: {}", e))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- users ---

async fn create_user(
    State(client): State<GatewayClient>,
    uri: Uri,
    Body(body): Body<UserBody>,
) -> AppResult<Response> {
    checked("create user", body.clone().validate())?;
    client.forward_json(Method::POST, &uri, None, &body).await
}

async fn list_users(State(client): State<GatewayClient>, uri: Uri) -> AppResult<Response> {
    client.forward(Method::GET, &uri, None).await
}

async fn get_user(
    State(client): State<GatewayClient>,
    uri: Uri,
    Id(_): Id,
) -> AppResult<Response> {
    client.forward(Method::GET, &uri, None).await
}

async fn update_user(
    State(client): State<GatewayClient>,
    uri: Uri,
    Id(_): Id,
    Body(body): Body<UserBody>,
) -> AppResult<Response> {
    checked("update user", body.clone().validate_patch())?;
    client.forward_json(Method::PATCH, &uri, None, &body).await
}

async fn delete_user(
    State(client): State<GatewayClient>,
    uri: Uri,
    Id(_): Id,
) -> AppResult<Response> {
    client.forward(Method::DELETE, &uri, None).await
}

// --- items ---

async fn create_item(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Body(body): Body<ItemBody>,
) -> AppResult<Response> {
    checked("create item", body.clone().validate())?;
    client.forward_json(Method::POST, &uri, Some(user), &body).await
}

async fn update_item(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
    Body(body): Body<ItemBody>,
) -> AppResult<Response> {
    checked("update item", body.clone().validate_patch())?;
    client.forward_json(Method::PATCH, &uri, Some(user), &body).await
}

async fn delete_item(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
) -> AppResult<Response> {
    client.forward(Method::DELETE, &uri, Some(user)).await
}

async fn get_item(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
) -> AppResult<Response> {
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn list_items(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Params(params): Params<PageParams>,
) -> AppResult<Response> {
    checked("list items", params.page())?;
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn search_items(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Params(params): Params<SearchParams>,
) -> AppResult<Response> {
    checked("search items", params.page())?;
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn add_comment(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
    Body(body): Body<CommentBody>,
) -> AppResult<Response> {
    checked("add comment", body.clone().validate())?;
    client.forward_json(Method::POST, &uri, Some(user), &body).await
}

// --- bookings ---

async fn create_booking(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Body(body): Body<BookingBody>,
) -> AppResult<Response> {
    checked("create booking", body.clone().validate())?;
    client.forward_json(Method::POST, &uri, Some(user), &body).await
}

async fn approve_booking(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
    Params(params): Params<ApprovalParams>,
) -> AppResult<Response> {
    checked("approve booking", params.approved().map(|_| ()))?;
    client.forward(Method::PATCH, &uri, Some(user)).await
}

async fn get_booking(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
) -> AppResult<Response> {
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn list_bookings(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Params(params): Params<StateParams>,
) -> AppResult<Response> {
    checked("list bookings", params.page())?;
    checked("list bookings", params.check_state())?;
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn list_owner_bookings(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Params(params): Params<StateParams>,
) -> AppResult<Response> {
    checked("list owner bookings", params.page())?;
    checked("list owner bookings", params.check_state())?;
    client.forward(Method::GET, &uri, Some(user)).await
}

// --- requests ---

async fn create_request(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Body(body): Body<RequestBody>,
) -> AppResult<Response> {
    checked("create request", body.clone().validate())?;
    client.forward_json(Method::POST, &uri, Some(user), &body).await
}

async fn list_requests(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Params(params): Params<PageParams>,
) -> AppResult<Response> {
    checked("list requests", params.page())?;
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn list_all_requests(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Params(params): Params<PageParams>,
) -> AppResult<Response> {
    checked("list all requests", params.page())?;
    client.forward(Method::GET, &uri, Some(user)).await
}

async fn get_request(
    State(client): State<GatewayClient>,
    uri: Uri,
    SharerId(user): SharerId,
    Id(_): Id,
) -> AppResult<Response> {
    client.forward(Method::GET, &uri, Some(user)).await
}
