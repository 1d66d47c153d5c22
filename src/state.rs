use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::booking::{BookingService, SqliteBookingRepository};
use crate::item::{ItemService, SqliteCommentRepository, SqliteItemRepository};
use crate::request::{RequestService, SqliteRequestRepository};
use crate::user::{SqliteUserRepository, UserService};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub users: Arc<UserService>,
    pub items: Arc<ItemService>,
    pub bookings: Arc<BookingService>,
    pub requests: Arc<RequestService>,
}

impl AppState {
    /// Wires every repository and service on top of one pool.
    pub fn new(db: DbPool) -> Self {
        Self {
            users: Arc::new(UserService::new(Arc::new(SqliteUserRepository::new(
                db.clone(),
            )))),
            items: Arc::new(ItemService::new(
                Arc::new(SqliteItemRepository::new(db.clone())),
                Arc::new(SqliteCommentRepository::new(db.clone())),
            )),
            bookings: Arc::new(BookingService::new(Arc::new(
                SqliteBookingRepository::new(db.clone()),
            ))),
            requests: Arc::new(RequestService::new(Arc::new(
                SqliteRequestRepository::new(db.clone()),
            ))),
            db,
        }
    }
}
