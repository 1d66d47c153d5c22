use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::{Body, Id, Params, SharerId};
use crate::ids::ItemId;
use crate::item::{Comment, Item, ItemView};
use crate::state::AppState;
use crate::validation::{CommentBody, ItemBody, PageParams, SearchParams};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_own_items).post(create_item))
        .route("/items/search", get(search_items))
        .route(
            "/items/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/{id}/comment", post(add_comment))
}

async fn create_item(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    Body(body): Body<ItemBody>,
) -> AppResult<Json<Item>> {
    tracing::info!(user_id = %owner, "Create item");
    let item = state.items.create(owner, body.validate()?).await?;
    Ok(Json(item))
}

async fn update_item(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    Id(id): Id,
    Body(body): Body<ItemBody>,
) -> AppResult<Json<Item>> {
    tracing::info!(user_id = %owner, item_id = id, "Update item");
    let item = state
        .items
        .update(owner, ItemId(id), body.validate_patch()?)
        .await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    Id(id): Id,
) -> AppResult<()> {
    tracing::info!(user_id = %owner, item_id = id, "Delete item");
    state.items.delete(owner, ItemId(id)).await
}

async fn get_item(
    State(state): State<AppState>,
    SharerId(viewer): SharerId,
    Id(id): Id,
) -> AppResult<Json<ItemView>> {
    tracing::info!(user_id = %viewer, item_id = id, "Get item");
    Ok(Json(state.items.read(ItemId(id), viewer).await?))
}

async fn list_own_items(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    Params(params): Params<PageParams>,
) -> AppResult<Json<Vec<ItemView>>> {
    tracing::info!(user_id = %owner, "List own items");
    let items = state.items.list_for_owner(owner, params.page()?).await?;
    Ok(Json(items))
}

async fn search_items(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    Params(params): Params<SearchParams>,
) -> AppResult<Json<Vec<Item>>> {
    tracing::info!(user_id = %user, text = params.text(), "Search items");
    let items = state.items.search(params.text(), params.page()?).await?;
    Ok(Json(items))
}

async fn add_comment(
    State(state): State<AppState>,
    SharerId(author): SharerId,
    Id(id): Id,
    Body(body): Body<CommentBody>,
) -> AppResult<Json<Comment>> {
    tracing::info!(user_id = %author, item_id = id, "Add comment");
    let comment = state
        .items
        .add_comment(ItemId(id), author, body.validate()?)
        .await?;
    Ok(Json(comment))
}
