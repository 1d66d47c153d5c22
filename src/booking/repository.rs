// Booking store - all booking SQL lives here.
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::Arc;

use crate::booking::domain::{
    BookedItem, Booking, BookingError, BookingSummary, Decision, NewBooking, Party, State,
    Status,
};
use crate::db::{self, placeholders, RepositoryError, TxError};
use crate::ids::{BookingId, ItemId, UserId};
use crate::pagination::Page;
use crate::state::DbPool;
use crate::user::repository::user_exists;
use crate::user::User;

/// A filtered, paged listing request.
#[derive(Debug, Clone)]
pub struct BookingQuery {
    pub party: Party,
    pub state: State,
    pub now: NaiveDateTime,
    pub page: Page,
}

/// Every method runs as one transaction; the `TxError` ones check their
/// preconditions inside it.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Admit and persist a new WAITING booking, returned joined with item and
    /// booker.
    async fn create(
        &self,
        booker: UserId,
        booking: &NewBooking,
    ) -> Result<Booking, TxError<BookingError>>;

    async fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;

    /// Apply the owner's decision to a WAITING booking. Concurrent decisions
    /// on the same booking are serialized; the later one sees it decided.
    async fn decide(
        &self,
        id: BookingId,
        caller: UserId,
        decision: Decision,
    ) -> Result<Booking, TxError<BookingError>>;

    /// Ordered by start descending, then id descending. The listed user must
    /// exist, and an owner must own at least one item.
    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>, TxError<BookingError>>;
}

pub struct SqliteBookingRepository {
    pool: DbPool,
}

impl SqliteBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const BOOKING_SELECT: &str = "SELECT b.id, b.start_date, b.end_date, b.status,
        i.item_id, i.name, i.description, i.is_available, i.owner_id,
        u.user_id, u.name, u.email
     FROM bookings b
     JOIN items i ON i.item_id = b.item_id
     JOIN users u ON u.user_id = b.booker_id";

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        start: row.get(1)?,
        end: row.get(2)?,
        status: row.get(3)?,
        item: BookedItem {
            id: row.get(4)?,
            name: row.get(5)?,
            description: row.get(6)?,
            available: row.get(7)?,
            owner_id: row.get(8)?,
        },
        booker: User {
            id: row.get(9)?,
            name: row.get(10)?,
            email: row.get(11)?,
        },
    })
}

fn party_clause(party: Party) -> &'static str {
    match party {
        Party::Booker(_) => "b.booker_id = ?",
        Party::Owner(_) => "i.owner_id = ?",
    }
}

fn state_clause(state: State) -> Option<&'static str> {
    match state {
        State::All => None,
        State::Current => Some("b.start_date <= ? AND b.end_date >= ?"),
        State::Past => Some("b.end_date < ?"),
        State::Future => Some("b.start_date > ?"),
        State::Waiting | State::Rejected => Some("b.status = ?"),
    }
}

fn state_params(state: State, now: NaiveDateTime) -> Vec<Box<dyn ToSql>> {
    match state {
        State::All => vec![],
        State::Current => vec![Box::new(now), Box::new(now)],
        State::Past | State::Future => vec![Box::new(now)],
        State::Waiting => vec![Box::new(Status::Waiting)],
        State::Rejected => vec![Box::new(Status::Rejected)],
    }
}

fn fetch_with(conn: &Connection, id: BookingId) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("{} WHERE b.id = ?1", BOOKING_SELECT),
        params![id],
        booking_from_row,
    )
    .optional()
}

fn booked_item(conn: &Connection, id: ItemId) -> rusqlite::Result<Option<BookedItem>> {
    conn.query_row(
        "SELECT item_id, name, description, is_available, owner_id FROM items WHERE item_id = ?1",
        params![id],
        |row| {
            Ok(BookedItem {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                available: row.get(3)?,
                owner_id: row.get(4)?,
            })
        },
    )
    .optional()
}

fn owns_items(conn: &Connection, owner: UserId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE owner_id = ?1)",
        params![owner],
        |row| row.get(0),
    )
}

/// Every booking of the given items, newest first.
pub(crate) fn summaries_for_items(
    conn: &Connection,
    items: &[ItemId],
) -> rusqlite::Result<Vec<BookingSummary>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, item_id, booker_id, start_date, end_date, status
         FROM bookings
         WHERE item_id IN ({})
         ORDER BY start_date DESC, id DESC",
        placeholders(items.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let summaries = stmt
        .query_map(params_from_iter(items.iter()), |row| {
            Ok(BookingSummary {
                id: row.get(0)?,
                item_id: row.get(1)?,
                booker_id: row.get(2)?,
                start: row.get(3)?,
                end: row.get(4)?,
                status: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summaries)
}

/// Whether `booker` has an APPROVED booking of `item` that ended before `now`.
pub(crate) fn has_finished_approved(
    conn: &Connection,
    item: ItemId,
    booker: UserId,
    now: NaiveDateTime,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE item_id = ?1 AND booker_id = ?2 AND status = ?3 AND end_date < ?4
         )",
        params![item, booker, Status::Approved, now],
        |row| row.get(0),
    )
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(
        &self,
        booker: UserId,
        booking: &NewBooking,
    ) -> Result<Booking, TxError<BookingError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<Booking, TxError<BookingError>> {
            let item = booked_item(conn, booking.item_id)?;
            let booker_exists = user_exists(conn, booker)?;
            booking
                .admit(booker, item.as_ref(), booker_exists)
                .map_err(TxError::Rejected)?;

            conn.execute(
                "INSERT INTO bookings (start_date, end_date, item_id, booker_id, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    booking.start,
                    booking.end,
                    booking.item_id,
                    booker,
                    Status::Waiting
                ],
            )?;
            let id = BookingId(conn.last_insert_rowid() as u64);

            fetch_with(conn, id)?
                .ok_or(TxError::Store(RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows)))
        })
    }

    async fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(fetch_with(&conn, id)?)
    }

    async fn decide(
        &self,
        id: BookingId,
        caller: UserId,
        decision: Decision,
    ) -> Result<Booking, TxError<BookingError>> {
        let conn = self.pool.get()?;

        db::immediate(&conn, |conn| -> Result<Booking, TxError<BookingError>> {
            let decided = fetch_with(conn, id)?
                .ok_or(BookingError::NotFound(id))
                .and_then(|booking| booking.decide(caller, decision))
                .map_err(TxError::Rejected)?;

            conn.execute(
                "UPDATE bookings SET status = ?1 WHERE id = ?2",
                params![decided.status, id],
            )?;

            Ok(decided)
        })
    }

    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>, TxError<BookingError>> {
        let user = query.party.user();
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user)];
        let mut clauses = vec![party_clause(query.party)];

        if let Some(clause) = state_clause(query.state) {
            clauses.push(clause);
            values.extend(state_params(query.state, query.now));
        }

        values.push(Box::new(query.page.size()));
        values.push(Box::new(query.page.offset()));

        let sql = format!(
            "{} WHERE {} ORDER BY b.start_date DESC, b.id DESC LIMIT ? OFFSET ?",
            BOOKING_SELECT,
            clauses.join(" AND ")
        );

        let conn = self.pool.get()?;
        db::snapshot(&conn, |conn| -> Result<Vec<Booking>, TxError<BookingError>> {
            if !user_exists(conn, user)? {
                return Err(TxError::Rejected(BookingError::UserNotFound(user)));
            }
            if let Party::Owner(owner) = query.party {
                if !owns_items(conn, owner)? {
                    return Err(TxError::Rejected(BookingError::NoItems(owner)));
                }
            }

            let mut stmt = conn.prepare(&sql)?;
            let bookings = stmt
                .query_map(params_from_iter(values.iter()), booking_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(bookings)
        })
    }
}

pub type DynBookingRepository = Arc<dyn BookingRepository>;
