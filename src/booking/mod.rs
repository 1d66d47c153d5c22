pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{
    BookedItem, Booking, BookingError, BookingSummary, Decision, NewBooking, Party, State, Status,
};
pub use repository::{BookingQuery, BookingRepository, DynBookingRepository, SqliteBookingRepository};
pub use service::BookingService;
