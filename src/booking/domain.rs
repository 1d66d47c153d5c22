// Booking lifecycle - pure types and transitions, no storage access.
use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::AppError;
use crate::ids::{BookingId, ItemId, UserId};
use crate::user::User;

/// Stored lifecycle tag of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Waiting,
    Approved,
    Rejected,
    /// Reserved. Nothing produces or consumes it yet.
    Canceled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "WAITING" => Some(Self::Waiting),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Status::from_db(text).ok_or_else(|| {
            FromSqlError::Other(format!("unknown booking status {}", text).into())
        })
    }
}

/// Query filter over a user's bookings. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl State {
    /// Case-insensitive. The error keeps the input as the client sent it.
    pub fn parse(text: &str) -> Result<Self, BookingError> {
        match text.to_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "CURRENT" => Ok(Self::Current),
            "PAST" => Ok(Self::Past),
            "FUTURE" => Ok(Self::Future),
            "WAITING" => Ok(Self::Waiting),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(BookingError::UnknownState(text.to_string())),
        }
    }

    /// Whether a booking with the given interval and status falls into this
    /// state at `now`.
    pub fn matches(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        status: Status,
        now: NaiveDateTime,
    ) -> bool {
        match self {
            Self::All => true,
            Self::Current => start <= now && now <= end,
            Self::Past => end < now,
            Self::Future => start > now,
            Self::Waiting => status == Status::Waiting,
            Self::Rejected => status == Status::Rejected,
        }
    }
}

/// The owner's answer to a waiting booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Accepts only "true" / "false", ignoring case.
    pub fn parse(approved: &str) -> Result<Self, BookingError> {
        match approved.to_lowercase().as_str() {
            "true" => Ok(Self::Approve),
            "false" => Ok(Self::Reject),
            _ => Err(BookingError::InvalidApproval(approved.to_string())),
        }
    }

    pub fn target_status(self) -> Status {
        match self {
            Self::Approve => Status::Approved,
            Self::Reject => Status::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub item_id: ItemId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl NewBooking {
    pub fn check_interval(&self) -> Result<(), BookingError> {
        if self.end > self.start {
            Ok(())
        } else {
            Err(BookingError::InvalidInterval {
                start: self.start,
                end: self.end,
            })
        }
    }

    /// Checks made against the stored item and booker, in this order: the
    /// item exists, the booker does not own it, it is available, the booker
    /// exists.
    pub fn admit(
        &self,
        booker: UserId,
        item: Option<&BookedItem>,
        booker_exists: bool,
    ) -> Result<(), BookingError> {
        let item = item.ok_or(BookingError::ItemNotFound(self.item_id))?;
        if item.owner_id == booker {
            return Err(BookingError::OwnItem);
        }
        if !item.available {
            return Err(BookingError::ItemUnavailable(item.id));
        }
        if !booker_exists {
            return Err(BookingError::UserNotFound(booker));
        }
        Ok(())
    }
}

/// Item fields embedded in a booking response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: UserId,
}

/// A booking joined with its item and booker, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: Status,
    pub item: BookedItem,
    pub booker: User,
}

impl Booking {
    pub fn owner_id(&self) -> UserId {
        self.item.owner_id
    }

    /// Only the booker and the item owner may see a booking.
    pub fn ensure_visible_to(&self, user: UserId) -> Result<(), BookingError> {
        if self.booker.id == user || self.owner_id() == user {
            Ok(())
        } else {
            Err(BookingError::NotParticipant {
                booking: self.id,
                user,
            })
        }
    }

    /// Transition: WAITING -> APPROVED | REJECTED, by the item owner only.
    /// The status guard is checked before ownership.
    pub fn decide(self, caller: UserId, decision: Decision) -> Result<Self, BookingError> {
        if self.status != Status::Waiting {
            return Err(BookingError::AlreadyDecided {
                booking: self.id,
                status: self.status,
            });
        }
        if self.owner_id() != caller {
            return Err(BookingError::NotOwner {
                booking: self.id,
                user: caller,
            });
        }
        Ok(Self {
            status: decision.target_status(),
            ..self
        })
    }
}

/// Compact booking shape used by the item projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub id: BookingId,
    pub item_id: ItemId,
    pub booker_id: UserId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: Status,
}

/// Whose bookings a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Booker(UserId),
    /// Bookings of any item this user owns.
    Owner(UserId),
}

impl Party {
    pub fn user(self) -> UserId {
        match self {
            Party::Booker(user) | Party::Owner(user) => user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("Booking end {end} must be after its start {start}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Item with id={0} not found")]
    ItemNotFound(ItemId),

    #[error("Owner cannot book their own item")]
    OwnItem,

    #[error("Item with id={0} is not available for booking")]
    ItemUnavailable(ItemId),

    #[error("User with id={0} not found")]
    UserNotFound(UserId),

    #[error("User with id={0} has no items")]
    NoItems(UserId),

    #[error("Booking with id={0} not found")]
    NotFound(BookingId),

    #[error("Invalid approved parameter: {0}")]
    InvalidApproval(String),

    #[error("Cannot change status of booking {booking}: it is already {status}")]
    AlreadyDecided { booking: BookingId, status: Status },

    #[error("User with id={user} does not own the item of booking {booking}")]
    NotOwner { booking: BookingId, user: UserId },

    #[error("User with id={user} is neither the booker nor the item owner of booking {booking}")]
    NotParticipant { booking: BookingId, user: UserId },

    #[error("{0}")]
    UnknownState(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidInterval { .. } => AppError::InvalidData(err.to_string()),
            BookingError::ItemUnavailable(_)
            | BookingError::InvalidApproval(_)
            | BookingError::AlreadyDecided { .. } => AppError::NotAvailable(err.to_string()),
            BookingError::UnknownState(input) => AppError::BadState(input),
            BookingError::ItemNotFound(_)
            | BookingError::OwnItem
            | BookingError::UserNotFound(_)
            | BookingError::NoItems(_)
            | BookingError::NotFound(_)
            | BookingError::NotOwner { .. }
            | BookingError::NotParticipant { .. } => AppError::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn waiting_booking() -> Booking {
        Booking {
            id: BookingId(1),
            start: at(10),
            end: at(12),
            status: Status::Waiting,
            item: BookedItem {
                id: ItemId(1),
                name: "Drill".into(),
                description: "Cordless drill".into(),
                available: true,
                owner_id: UserId(1),
            },
            booker: User {
                id: UserId(2),
                name: "Bob".into(),
                email: "bob@example.com".into(),
            },
        }
    }

    #[test]
    fn state_parse_ignores_case() {
        assert_eq!(State::parse("current").unwrap(), State::Current);
        assert_eq!(State::parse("Past").unwrap(), State::Past);
        assert_eq!(State::parse("ALL").unwrap(), State::All);
    }

    #[test]
    fn unknown_state_keeps_raw_input() {
        let err = State::parse("qwe").unwrap_err();
        assert_eq!(err, BookingError::UnknownState("qwe".into()));
        match AppError::from(err) {
            AppError::BadState(input) => assert_eq!(input, "qwe"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn state_predicates() {
        let now = at(11);
        let (start, end) = (at(10), at(12));
        assert!(State::Current.matches(start, end, Status::Approved, now));
        assert!(!State::Past.matches(start, end, Status::Approved, now));
        assert!(!State::Future.matches(start, end, Status::Approved, now));
        assert!(State::Past.matches(at(1), at(2), Status::Approved, now));
        assert!(State::Future.matches(at(13), at(14), Status::Approved, now));
        assert!(State::Waiting.matches(start, end, Status::Waiting, now));
        assert!(!State::Rejected.matches(start, end, Status::Waiting, now));
        assert!(State::All.matches(start, end, Status::Canceled, now));
    }

    #[test]
    fn current_includes_both_boundaries() {
        assert!(State::Current.matches(at(10), at(12), Status::Waiting, at(10)));
        assert!(State::Current.matches(at(10), at(12), Status::Waiting, at(12)));
    }

    #[test]
    fn decision_parse() {
        assert_eq!(Decision::parse("TRUE").unwrap(), Decision::Approve);
        assert_eq!(Decision::parse("false").unwrap(), Decision::Reject);
        assert!(matches!(
            Decision::parse("yes"),
            Err(BookingError::InvalidApproval(_))
        ));
    }

    #[test]
    fn interval_must_be_positive() {
        let booking = NewBooking {
            item_id: ItemId(1),
            start: at(10),
            end: at(10),
        };
        assert!(matches!(
            booking.check_interval(),
            Err(BookingError::InvalidInterval { .. })
        ));

        let reversed = NewBooking {
            end: at(10) - Duration::hours(1),
            ..booking.clone()
        };
        assert!(reversed.check_interval().is_err());

        let valid = NewBooking {
            end: at(11),
            ..booking
        };
        assert!(valid.check_interval().is_ok());
    }

    #[test]
    fn admit_checks_item_then_owner_then_availability_then_booker() {
        let booking = NewBooking {
            item_id: ItemId(1),
            start: at(10),
            end: at(11),
        };
        let mut item = waiting_booking().item;

        assert_eq!(
            booking.admit(UserId(2), None, false),
            Err(BookingError::ItemNotFound(ItemId(1)))
        );
        item.available = false;
        assert_eq!(
            booking.admit(UserId(1), Some(&item), true),
            Err(BookingError::OwnItem)
        );
        assert_eq!(
            booking.admit(UserId(9), Some(&item), false),
            Err(BookingError::ItemUnavailable(ItemId(1)))
        );
        item.available = true;
        assert_eq!(
            booking.admit(UserId(9), Some(&item), false),
            Err(BookingError::UserNotFound(UserId(9)))
        );
        assert_eq!(booking.admit(UserId(2), Some(&item), true), Ok(()));
    }

    #[test]
    fn owner_can_approve_or_reject_waiting() {
        let approved = waiting_booking()
            .decide(UserId(1), Decision::Approve)
            .unwrap();
        assert_eq!(approved.status, Status::Approved);

        let rejected = waiting_booking()
            .decide(UserId(1), Decision::Reject)
            .unwrap();
        assert_eq!(rejected.status, Status::Rejected);
    }

    #[test]
    fn decided_booking_cannot_change_again() {
        let approved = waiting_booking()
            .decide(UserId(1), Decision::Approve)
            .unwrap();
        let result = approved.decide(UserId(1), Decision::Reject);
        assert!(matches!(result, Err(BookingError::AlreadyDecided { .. })));
    }

    #[test]
    fn status_guard_precedes_ownership() {
        let mut booking = waiting_booking();
        booking.status = Status::Rejected;
        let err = booking.decide(UserId(2), Decision::Approve).unwrap_err();
        assert!(matches!(AppError::from(err), AppError::NotAvailable(_)));
    }

    #[test]
    fn non_owner_decision_is_not_found() {
        let err = waiting_booking()
            .decide(UserId(2), Decision::Approve)
            .unwrap_err();
        assert!(matches!(err, BookingError::NotOwner { .. }));
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }

    #[test]
    fn visibility_is_limited_to_participants() {
        let booking = waiting_booking();
        assert!(booking.ensure_visible_to(UserId(1)).is_ok());
        assert!(booking.ensure_visible_to(UserId(2)).is_ok());
        assert!(booking.ensure_visible_to(UserId(3)).is_err());
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&Status::Waiting).unwrap(),
            "\"WAITING\""
        );
        assert_eq!(Status::from_db("APPROVED"), Some(Status::Approved));
        assert_eq!(Status::from_db("approved"), None);
    }
}
