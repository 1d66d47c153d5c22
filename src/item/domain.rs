use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::{BookingSummary, Status};
use crate::error::AppError;
use crate::ids::{CommentId, ItemId, RequestId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: UserId,
    pub request_id: Option<RequestId>,
}

impl Item {
    pub fn apply(self, patch: ItemPatch) -> Self {
        Self {
            name: patch.name.unwrap_or(self.name),
            description: patch.description.unwrap_or(self.description),
            available: patch.available.unwrap_or(self.available),
            ..self
        }
    }

    pub fn ensure_owned_by(&self, user: UserId) -> Result<(), ItemError> {
        if self.owner_id == user {
            Ok(())
        } else {
            Err(ItemError::NotOwner {
                item: self.id,
                user,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub author_name: String,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub item_id: ItemId,
    pub author_id: UserId,
    pub text: String,
    pub created: NaiveDateTime,
}

impl NewComment {
    /// `eligible`: the author finished an approved booking of the item before
    /// `created`. Eligibility is checked before the text.
    pub fn admit(&self, eligible: bool) -> Result<(), ItemError> {
        if !eligible {
            return Err(ItemError::CommentNotAllowed {
                item: self.item_id,
                user: self.author_id,
            });
        }
        if self.text.trim().is_empty() {
            return Err(ItemError::BlankComment);
        }
        Ok(())
    }
}

/// An item with everything its projection needs, read in one snapshot.
/// `bookings` is empty unless the reader owns the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub item: Item,
    pub comments: Vec<Comment>,
    pub bookings: Vec<BookingSummary>,
}

/// An item decorated with its comments and, for the owner, its adjacent
/// bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub last_booking: Option<BookingSummary>,
    pub next_booking: Option<BookingSummary>,
    pub comments: Vec<Comment>,
}

impl ItemView {
    pub fn from_record(record: ItemRecord, viewer: UserId, now: NaiveDateTime) -> Self {
        Self::project(record.item, viewer, &record.bookings, record.comments, now)
    }

    /// `bookings` is only consulted when the viewer owns the item.
    pub fn project(
        item: Item,
        viewer: UserId,
        bookings: &[BookingSummary],
        comments: Vec<Comment>,
        now: NaiveDateTime,
    ) -> Self {
        let (last_booking, next_booking) = if item.owner_id == viewer {
            (
                last_booking(bookings, now).cloned(),
                next_booking(bookings, now).cloned(),
            )
        } else {
            (None, None)
        };

        Self {
            item,
            last_booking,
            next_booking,
            comments,
        }
    }
}

/// Latest booking that has already started, whatever its status.
pub fn last_booking(bookings: &[BookingSummary], now: NaiveDateTime) -> Option<&BookingSummary> {
    bookings
        .iter()
        .filter(|b| b.start <= now)
        .max_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)))
}

/// Earliest booking still to start. Rejected and canceled bookings never qualify.
pub fn next_booking(bookings: &[BookingSummary], now: NaiveDateTime) -> Option<&BookingSummary> {
    bookings
        .iter()
        .filter(|b| b.start > now && matches!(b.status, Status::Approved | Status::Waiting))
        .min_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("Item with id={0} not found")]
    NotFound(ItemId),

    #[error("User with id={user} does not own item {item}")]
    NotOwner { item: ItemId, user: UserId },

    #[error("User with id={0} not found")]
    OwnerNotFound(UserId),

    #[error("Request with id={0} not found")]
    RequestNotFound(RequestId),

    #[error("User with id={user} has no finished approved booking of item {item}")]
    CommentNotAllowed { item: ItemId, user: UserId },

    #[error("Comment text must not be blank")]
    BlankComment,
}

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::CommentNotAllowed { .. } => AppError::NotAvailable(err.to_string()),
            ItemError::BlankComment => AppError::InvalidData(err.to_string()),
            ItemError::NotFound(_)
            | ItemError::NotOwner { .. }
            | ItemError::OwnerNotFound(_)
            | ItemError::RequestNotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}
