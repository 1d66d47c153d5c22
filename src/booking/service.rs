use crate::booking::domain::{Booking, BookingError, Decision, NewBooking, Party, State};
use crate::booking::repository::{BookingQuery, DynBookingRepository};
use crate::clock;
use crate::error::AppResult;
use crate::ids::{BookingId, UserId};
use crate::pagination::Page;

/// The booking engine: creation, the owner's decision, and the two listings.
/// Checks that need stored rows run inside the store's transaction.
pub struct BookingService {
    bookings: DynBookingRepository,
}

impl BookingService {
    pub fn new(bookings: DynBookingRepository) -> Self {
        Self { bookings }
    }

    pub async fn create(&self, booker: UserId, booking: NewBooking) -> AppResult<Booking> {
        booking.check_interval()?;

        let created = self.bookings.create(booker, &booking).await?;
        tracing::info!(
            booking_id = %created.id,
            item_id = %created.item.id,
            booker_id = %booker,
            "Booking requested"
        );
        Ok(created)
    }

    /// `approved` is the raw query value; only "true"/"false" are accepted.
    pub async fn approve(
        &self,
        owner: UserId,
        id: BookingId,
        approved: &str,
    ) -> AppResult<Booking> {
        let decision = Decision::parse(approved)?;

        let decided = self.bookings.decide(id, owner, decision).await?;
        tracing::info!(booking_id = %id, status = %decided.status, "Booking decided");
        Ok(decided)
    }

    pub async fn read(&self, id: BookingId, user: UserId) -> AppResult<Booking> {
        let booking = self
            .bookings
            .fetch(id)
            .await?
            .ok_or(BookingError::NotFound(id))?;
        booking.ensure_visible_to(user)?;
        Ok(booking)
    }

    pub async fn list_for_booker(
        &self,
        page: Page,
        booker: UserId,
        state: &str,
    ) -> AppResult<Vec<Booking>> {
        let state = State::parse(state)?;
        self.list(Party::Booker(booker), state, page).await
    }

    pub async fn list_for_owner(
        &self,
        page: Page,
        owner: UserId,
        state: &str,
    ) -> AppResult<Vec<Booking>> {
        let state = State::parse(state)?;
        self.list(Party::Owner(owner), state, page).await
    }

    async fn list(&self, party: Party, state: State, page: Page) -> AppResult<Vec<Booking>> {
        let query = BookingQuery {
            party,
            state,
            now: clock::now(),
            page,
        };
        Ok(self.bookings.list(&query).await?)
    }
}
