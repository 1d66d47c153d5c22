use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;
use crate::ids::{RequestId, UserId};
use crate::item::Item;

/// A wishlist entry: someone asking for an item nobody has published yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    pub id: RequestId,
    pub description: String,
    pub requester_id: UserId,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub description: String,
}

/// A request together with the items published in answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: RequestId,
    pub description: String,
    pub created: NaiveDateTime,
    pub items: Vec<Item>,
}

impl RequestView {
    pub fn new(request: ItemRequest, items: Vec<Item>) -> Self {
        Self {
            id: request.id,
            description: request.description,
            created: request.created,
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request with id={0} not found")]
    NotFound(RequestId),

    #[error("User with id={0} not found")]
    UserNotFound(UserId),
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        AppError::NotFound(err.to_string())
    }
}
